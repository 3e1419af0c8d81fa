//! Infrastructure-level errors (wraps application errors)

use std::path::PathBuf;

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

/// Infrastructure errors wrap application errors and add I/O-level concerns.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed preferences document {}: {reason}", location.display())]
    MalformedDocument { location: PathBuf, reason: String },

    #[error("backing store not found: {}", location.display())]
    BackingStoreUnavailable { location: PathBuf },

    #[error("cannot serialize preferences: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl InfraError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn malformed(location: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// True for a store that simply does not exist yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::BackingStoreUnavailable { .. })
    }
}

impl From<DomainError> for InfraError {
    fn from(e: DomainError) -> Self {
        Self::Application(ApplicationError::Domain(e))
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;
