//! Domain error types.

/// A parse error with position information for condition expressions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    ///
    /// `position` is a byte offset; the caret is indented by characters.
    pub fn display_with_context(&self, input: &str) -> String {
        let column = input
            .get(..self.position)
            .map_or(self.position, |prefix| prefix.chars().count());
        let caret = " ".repeat(column) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Why a predicate could not be resolved at a given bar.
///
/// These never abort a run: the simulator treats the predicate as false and
/// records the failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error(transparent)]
    Syntax(#[from] ParseError),

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("operator '{op}' expects {expected} operands")]
    TypeMismatch { op: &'static str, expected: &'static str },

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic produced a non-finite value")]
    NonFinite,

    #[error("expression does not produce a boolean")]
    NotBoolean,
}

/// Top-level error type for tradesim.
#[derive(Debug, thiserror::Error)]
pub enum TradesimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("strategy descriptor could not be parsed: {reason}")]
    DescriptorParse { reason: String },

    #[error("strategy descriptor is missing required fields: {}", fields.join(", "))]
    DescriptorMissing { fields: Vec<String> },

    #[error("invalid strategy descriptor value {key}: {reason}")]
    DescriptorInvalid { key: String, reason: String },

    #[error("unknown strategy '{name}'")]
    UnknownStrategy { name: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no bars in {source_name}")]
    NoData { source_name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TradesimError> for std::process::ExitCode {
    fn from(err: &TradesimError) -> Self {
        let code: u8 = match err {
            TradesimError::Io(_) => 1,
            TradesimError::ConfigParse { .. }
            | TradesimError::ConfigMissing { .. }
            | TradesimError::ConfigInvalid { .. } => 2,
            TradesimError::Data { .. } => 3,
            TradesimError::DescriptorParse { .. }
            | TradesimError::DescriptorMissing { .. }
            | TradesimError::DescriptorInvalid { .. } => 4,
            TradesimError::NoData { .. } | TradesimError::UnknownStrategy { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
