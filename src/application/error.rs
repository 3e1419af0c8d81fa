//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add binding-level context.
///
/// Conversion and field access failures are isolated per field: the binding
/// engine logs them and carries on with the remaining fields.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("cannot convert {value} to {target}: {reason}")]
    Conversion {
        target: String,
        value: String,
        reason: String,
    },

    #[error("cannot access field {field}: {reason}")]
    FieldAccess { field: String, reason: String },

    #[error("config error: {message}")]
    Config { message: String },
}

impl ApplicationError {
    pub fn conversion(
        target: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            target: target.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn field_access(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FieldAccess {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
