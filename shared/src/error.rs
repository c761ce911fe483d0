//! Domain errors raised by pure calculations and model guards

use thiserror::Error;

/// Errors produced by the shared domain layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("{0} is finalized and must be reopened before it can change")]
    AlreadyFinalized(String),

    #[error("Invalid permission matrix: {0}")]
    InvalidMatrix(String),
}

impl DomainError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
