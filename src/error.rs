//! Error taxonomy shared by the store and the submission pipeline

use std::time::Duration;

use rusqlite::ErrorCode;

/// Errors surfaced by learnpath operations
#[derive(Debug, thiserror::Error)]
pub enum LearnError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Uniqueness constraint hit by a concurrent writer
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("store call '{op}' timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("transient store failure: {0}")]
    Transient(String),

    #[error("store error: {0}")]
    Backend(String),

    #[error("corrupt stored JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LearnError>;

impl LearnError {
    pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Whether the caller may retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transient(_))
    }
}

impl From<rusqlite::Error> for LearnError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => Self::Constraint(err.to_string()),
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                Self::Transient(err.to_string())
            }
            _ => Self::Backend(err.to_string()),
        }
    }
}
