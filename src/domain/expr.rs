//! Condition expression AST and parser.
//!
//! Recursive descent parser for the condition grammar:
//!
//! ```text
//! or      := and ( "||" and )*
//! and     := cmp ( "&&" cmp )*
//! cmp     := sum ( ("=="|"!="|"<="|">="|"<"|">") sum )?
//! sum     := product ( ("+"|"-") product )*
//! product := unary ( ("*"|"/"|"%") unary )*
//! unary   := ("-"|"!") unary | primary
//! primary := number | "true" | "false" | identifier | "(" or ")"
//! ```
//!
//! Identifiers are whole words; they are only ever looked up in an explicit
//! context at evaluation time.
//!
//! Nesting depth and operator count are bounded so that parsing, evaluating
//! and dropping an expression never recurse without limit.

use crate::domain::error::ParseError;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Bool(bool),
    Ident(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

impl Expr {
    /// Every identifier the expression refers to.
    pub fn identifiers(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Ident(name) => {
                out.insert(name.as_str());
            }
            Expr::Unary { operand, .. } => operand.collect_identifiers(out),
            Expr::Binary { left, right, .. } => {
                left.collect_identifiers(out);
                right.collect_identifiers(out);
            }
            Expr::Number(_) | Expr::Bool(_) => {}
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Ident(name) => write!(f, "{}", name),
            Expr::Unary { op, operand } => match op {
                UnaryOp::Neg => write!(f, "-{}", operand),
                UnaryOp::Not => write!(f, "!{}", operand),
            },
            Expr::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
        }
    }
}

/// Deepest allowed chain of parentheses and unary operators.
pub const MAX_NESTING: usize = 256;
/// Most operators a single expression may contain.
pub const MAX_OPERATORS: usize = 1024;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
    operators: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
            operators: 0,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn consume_exact(&mut self, s: &str) -> bool {
        if self.remaining().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.pos,
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error("expression nested too deeply"));
        }
        Ok(())
    }

    fn count_operator(&mut self) -> Result<(), ParseError> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(self.error("expression has too many operators"));
        }
        Ok(())
    }

    fn found(&self) -> String {
        self.peek()
            .map(|c| format!("'{}'", c))
            .unwrap_or_else(|| "end of input".to_string())
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        loop {
            self.skip_whitespace();
            if !self.consume_exact("||") {
                return Ok(left);
            }
            self.count_operator()?;
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;
        loop {
            self.skip_whitespace();
            if !self.consume_exact("&&") {
                return Ok(left);
            }
            self.count_operator()?;
            let right = self.parse_comparison()?;
            left = binary(BinaryOp::And, left, right);
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_sum()?;
        self.skip_whitespace();

        // two-character operators first so "<=" is not read as "<"
        let op = if self.consume_exact("==") {
            BinaryOp::Eq
        } else if self.consume_exact("!=") {
            BinaryOp::Ne
        } else if self.consume_exact("<=") {
            BinaryOp::Le
        } else if self.consume_exact(">=") {
            BinaryOp::Ge
        } else if self.consume_exact("<") {
            BinaryOp::Lt
        } else if self.consume_exact(">") {
            BinaryOp::Gt
        } else {
            return Ok(left);
        };

        self.count_operator()?;
        let right = self.parse_sum()?;
        Ok(binary(op, left, right))
    }

    fn parse_sum(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_product()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                Some('+') => BinaryOp::Add,
                Some('-') => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            self.count_operator()?;
            let right = self.parse_product()?;
            left = binary(op, left, right);
        }
    }

    fn parse_product(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                Some('*') => BinaryOp::Mul,
                Some('/') => BinaryOp::Div,
                Some('%') => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.advance();
            self.count_operator()?;
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        let op = match self.peek() {
            Some('-') => UnaryOp::Neg,
            Some('!') if !self.remaining().starts_with("!=") => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        self.advance();
        self.count_operator()?;
        self.enter()?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.parse_number(),
            Some(ch) if ch.is_alphabetic() || ch == '_' => Ok(self.parse_identifier()),
            Some('(') => {
                self.advance();
                self.enter()?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                self.skip_whitespace();
                if self.peek() == Some(')') {
                    self.advance();
                    Ok(inner)
                } else {
                    Err(self.error(format!("expected ')', found {}", self.found())))
                }
            }
            _ => Err(self.error(format!("expected operand, found {}", self.found()))),
        }
    }

    fn parse_number(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<f64>()
            .map(Expr::Number)
            .map_err(|_| ParseError {
                message: format!("invalid number: {}", num_str),
                position: start,
            })
    }

    fn parse_identifier(&mut self) -> Expr {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        match &self.input[start..self.pos] {
            "true" => Expr::Bool(true),
            "false" => Expr::Bool(false),
            word => Expr::Ident(word.to_string()),
        }
    }

    fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_or()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(format!(
                "unexpected input after expression: '{}'",
                self.remaining()
            )));
        }
        Ok(expr)
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(input);
    parser.parse()
}
