//! Error handling for the mill workflow engine
//!
//! Every failure carries enough context (current phase, attempted phase,
//! missing fields) for an outer layer to render an actionable message.

use serde::Serialize;
use shared::{DomainError, UserRole, WorkflowPhase};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Workflow errors
    #[error("Role {role} may not {action}")]
    PermissionDenied { role: UserRole, action: String },

    #[error("Invalid transition from {current} to {attempted}")]
    InvalidTransition { current: String, attempted: String },

    #[error("Incomplete data for {phase}: missing {}", .missing.join(", "))]
    IncompleteStageData {
        phase: WorkflowPhase,
        missing: Vec<String>,
    },

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Already finalized: {0}")]
    AlreadyFinalized(String),

    #[error("{operation} is not allowed while the entry is in {current}")]
    WrongPhase {
        operation: String,
        current: WorkflowPhase,
    },

    // Lookup and concurrency errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Input errors
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Storage errors
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    // Internal errors
    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn permission_denied(role: UserRole, action: impl Into<String>) -> Self {
        AppError::PermissionDenied {
            role,
            action: action.into(),
        }
    }

    pub fn invalid_transition(current: WorkflowPhase, attempted: WorkflowPhase) -> Self {
        AppError::InvalidTransition {
            current: current.to_string(),
            attempted: attempted.to_string(),
        }
    }

    pub fn incomplete(phase: WorkflowPhase, missing: &[&str]) -> Self {
        AppError::IncompleteStageData {
            phase,
            missing: missing.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn wrong_phase(operation: &str, current: WorkflowPhase) -> Self {
        AppError::WrongPhase {
            operation: operation.to_string(),
            current,
        }
    }

    /// Stable machine-readable code of the error kind
    pub fn code(&self) -> &'static str {
        match self {
            AppError::PermissionDenied { .. } => "PERMISSION_DENIED",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::IncompleteStageData { .. } => "INCOMPLETE_STAGE_DATA",
            AppError::InvariantViolation(_) => "INVARIANT_VIOLATION",
            AppError::AlreadyFinalized(_) => "ALREADY_FINALIZED",
            AppError::WrongPhase { .. } => "WRONG_PHASE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Serializable diagnostic payload for the outer layer
    pub fn detail(&self) -> ErrorDetail {
        let mut detail = ErrorDetail {
            code: self.code().to_string(),
            message: self.to_string(),
            current_phase: None,
            attempted_phase: None,
            fields: Vec::new(),
        };
        match self {
            AppError::InvalidTransition { current, attempted } => {
                detail.current_phase = Some(current.clone());
                detail.attempted_phase = Some(attempted.clone());
            }
            AppError::IncompleteStageData { phase, missing } => {
                detail.current_phase = Some(phase.to_string());
                detail.fields = missing.clone();
            }
            AppError::WrongPhase { current, .. } => {
                detail.current_phase = Some(current.to_string());
            }
            AppError::Validation { field, .. } => {
                detail.fields = vec![field.clone()];
            }
            // Storage internals stay in the logs
            AppError::PersistenceFailure(_) => {
                detail.message = "The change could not be saved".to_string();
            }
            AppError::Internal(_) => {
                detail.message = "An internal error occurred".to_string();
            }
            _ => {}
        }
        detail
    }
}

/// Error payload returned to callers
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempted_phase: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { field, message } => AppError::Validation { field, message },
            DomainError::InvariantViolation(msg) => AppError::InvariantViolation(msg),
            DomainError::AlreadyFinalized(msg) => AppError::AlreadyFinalized(msg),
            DomainError::InvalidMatrix(msg) => AppError::Configuration(msg),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::PersistenceFailure(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::PersistenceFailure(format!("record encoding: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<(&str, String)> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "is invalid".to_string());
                (field, message)
            })
            .collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));
        match fields.into_iter().next() {
            Some((field, message)) => AppError::Validation {
                field: field.to_string(),
                message,
            },
            None => AppError::Validation {
                field: "input".to_string(),
                message: "is invalid".to_string(),
            },
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias for engine operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_detail_lists_fields() {
        let err = AppError::incomplete(WorkflowPhase::QualityCheck, &["quality_parameters"]);
        let detail = err.detail();
        assert_eq!(detail.code, "INCOMPLETE_STAGE_DATA");
        assert_eq!(detail.current_phase.as_deref(), Some("QUALITY_CHECK"));
        assert_eq!(detail.fields, vec!["quality_parameters".to_string()]);
        assert!(detail.message.contains("quality_parameters"));
    }

    #[test]
    fn test_invalid_transition_detail() {
        let err = AppError::invalid_transition(WorkflowPhase::StaffEntry, WorkflowPhase::LotSelection);
        let detail = err.detail();
        assert_eq!(detail.current_phase.as_deref(), Some("STAFF_ENTRY"));
        assert_eq!(detail.attempted_phase.as_deref(), Some("LOT_SELECTION"));
    }

    #[test]
    fn test_domain_errors_map_to_kinds() {
        let err: AppError = DomainError::AlreadyFinalized("offering".into()).into();
        assert_eq!(err.code(), "ALREADY_FINALIZED");
        let err: AppError = DomainError::validation("bags", "Bags cannot be negative").into();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "bags"));
    }

    #[test]
    fn test_persistence_detail_hides_internals() {
        let err = AppError::PersistenceFailure("connection reset by peer".into());
        let json = serde_json::to_value(err.detail()).unwrap();
        assert_eq!(json["code"], "PERSISTENCE_FAILURE");
        assert!(!json["message"].as_str().unwrap().contains("peer"));
        assert!(json.get("fields").is_none());
    }
}
