//! Sync error taxonomy.
//!
//! # Invariants
//! - `Validation` failures happen before any state change.
//! - `Backend` failures of the latest mutation trigger rollback.
//! - No variant is fatal; callers degrade to local-only operation.

use crate::model::validation::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type BackendResult<T> = Result<T, BackendError>;
pub type SyncResult<T> = Result<T, SyncError>;

/// Failure reported by the backend collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Transport failure: connect/timeout/IO.
    Network(String),
    /// Non-2xx response; `message` is the response body text.
    Status { status: u16, message: String },
    /// 2xx response whose body did not decode.
    InvalidResponse(String),
}

impl BackendError {
    /// Stable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "network_error",
            Self::Status { .. } => "backend_error",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(message) => write!(f, "network error: {message}"),
            Self::Status { status, message } => {
                if message.trim().is_empty() {
                    write!(f, "backend returned status {status}")
                } else {
                    write!(f, "backend returned status {status}: {}", message.trim())
                }
            }
            Self::InvalidResponse(message) => write!(f, "invalid backend response: {message}"),
        }
    }
}

impl Error for BackendError {}

/// Error surfaced by sync-layer operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    Validation(ValidationError),
    Backend(BackendError),
}

impl SyncError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Backend(err) => err.code(),
        }
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Backend(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Backend(err) => Some(err),
        }
    }
}

impl From<ValidationError> for SyncError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<BackendError> for SyncError {
    fn from(value: BackendError) -> Self {
        Self::Backend(value)
    }
}
