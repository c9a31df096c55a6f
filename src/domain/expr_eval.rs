//! Condition expression evaluation.
//!
//! Evaluates a parsed `Expr` against an explicit name → number context.
//! Nothing outside that context is reachable from an expression.
//!
//! # Evaluation Semantics
//!
//! - Arithmetic and ordering comparisons take numbers
//! - `&&`, `||`, `!` take booleans; `&&`/`||` short-circuit
//! - `==`/`!=` compare like types, numbers within `EPSILON`
//! - Division or remainder by zero and non-finite results are errors

use crate::domain::error::EvalError;
use crate::domain::expr::{BinaryOp, Expr, UnaryOp};
use std::collections::HashMap;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
}

pub fn evaluate(expr: &Expr, context: &HashMap<String, f64>) -> Result<Value, EvalError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Ident(name) => context
            .get(name)
            .copied()
            .map(Value::Number)
            .ok_or_else(|| EvalError::UnknownIdentifier(name.clone())),
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, context)?;
            match (op, value) {
                (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
                (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                (UnaryOp::Neg, _) => Err(EvalError::TypeMismatch {
                    op: "-",
                    expected: "numeric",
                }),
                (UnaryOp::Not, _) => Err(EvalError::TypeMismatch {
                    op: "!",
                    expected: "boolean",
                }),
            }
        }
        Expr::Binary { op, left, right } => evaluate_binary(*op, left, right, context),
    }
}

/// Evaluate an expression that must produce a boolean.
pub fn evaluate_bool(expr: &Expr, context: &HashMap<String, f64>) -> Result<bool, EvalError> {
    match evaluate(expr, context)? {
        Value::Bool(b) => Ok(b),
        Value::Number(_) => Err(EvalError::NotBoolean),
    }
}

fn evaluate_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    context: &HashMap<String, f64>,
) -> Result<Value, EvalError> {
    match op {
        BinaryOp::And => {
            if !expect_bool(op, evaluate(left, context)?)? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(expect_bool(op, evaluate(right, context)?)?))
        }
        BinaryOp::Or => {
            if expect_bool(op, evaluate(left, context)?)? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(expect_bool(op, evaluate(right, context)?)?))
        }
        BinaryOp::Eq | BinaryOp::Ne => {
            let equal = match (evaluate(left, context)?, evaluate(right, context)?) {
                (Value::Number(a), Value::Number(b)) => (a - b).abs() < EPSILON,
                (Value::Bool(a), Value::Bool(b)) => a == b,
                _ => {
                    return Err(EvalError::TypeMismatch {
                        op: op.symbol(),
                        expected: "matching",
                    });
                }
            };
            Ok(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal }))
        }
        _ => {
            let a = expect_number(op, evaluate(left, context)?)?;
            let b = expect_number(op, evaluate(right, context)?)?;
            let value = match op {
                BinaryOp::Lt => return Ok(Value::Bool(a < b)),
                BinaryOp::Le => return Ok(Value::Bool(a <= b)),
                BinaryOp::Gt => return Ok(Value::Bool(a > b)),
                BinaryOp::Ge => return Ok(Value::Bool(a >= b)),
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div | BinaryOp::Rem if b == 0.0 => {
                    return Err(EvalError::DivisionByZero);
                }
                BinaryOp::Div => a / b,
                BinaryOp::Rem => a % b,
                BinaryOp::And | BinaryOp::Or | BinaryOp::Eq | BinaryOp::Ne => unreachable!(),
            };
            if value.is_finite() {
                Ok(Value::Number(value))
            } else {
                Err(EvalError::NonFinite)
            }
        }
    }
}

fn expect_bool(op: BinaryOp, value: Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        Value::Number(_) => Err(EvalError::TypeMismatch {
            op: op.symbol(),
            expected: "boolean",
        }),
    }
}

fn expect_number(op: BinaryOp, value: Value) -> Result<f64, EvalError> {
    match value {
        Value::Number(n) => Ok(n),
        Value::Bool(_) => Err(EvalError::TypeMismatch {
            op: op.symbol(),
            expected: "numeric",
        }),
    }
}
