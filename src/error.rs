use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`].
///
/// Configuration errors are fatal for the node or registry that produced them.
/// Shape errors are recoverable by the caller, who may reject or reconfigure
/// the node. Execution errors come from a kernel being handed tensors that do
/// not match what it was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Shape,
    Execution,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown parameter '{key}' for operator {kind}")]
    UnknownParameter { kind: String, key: String },

    #[error("Missing required parameter '{field}' for operator {kind}")]
    MissingParameter { kind: String, field: String },

    #[error("Invalid value '{value}' for parameter '{field}' of operator {kind}: {reason}")]
    InvalidParameter {
        kind: String,
        field: String,
        value: String,
        reason: String,
    },

    #[error("Operator {0} is already registered")]
    DuplicateRegistration(String),

    #[error("Operator {0} not found in registry")]
    UnknownOperator(String),

    #[error("Operator {kind} has no implementation for context {context}")]
    UnsupportedContext { kind: String, context: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Shape inference failed for {kind}: {reason}")]
    Shape { kind: String, reason: String },

    #[error("Execution error: {0}")]
    Execution(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Shape { .. } => ErrorKind::Shape,
            Error::Execution(_) => ErrorKind::Execution,
            _ => ErrorKind::Configuration,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    pub(crate) fn shape(kind: &str, reason: impl Into<String>) -> Self {
        Error::Shape {
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }
}
