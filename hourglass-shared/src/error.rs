/// Domain error type shared by repository functions and business rules
///
/// Handlers in the API crate map these onto HTTP responses; nothing in this
/// crate knows about status codes.

use serde::{Deserialize, Serialize};

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field that failed validation (camelCase, as sent by the client)
    pub field: String,

    /// Human-readable message
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by domain operations
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// Malformed or out-of-range input
    #[error("Validation failed: {} errors", .0.len())]
    Validation(Vec<FieldError>),

    /// A referenced entity does not exist (or is not visible to the actor)
    #[error("{0}")]
    NotFound(String),

    /// Role or ownership check failed
    #[error("{0}")]
    Forbidden(String),

    /// Uniqueness violation
    #[error("{0}")]
    Conflict(String),

    /// Storage failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl DomainError {
    /// Shorthand for a validation error on a single field
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation(vec![FieldError::new(field, message)])
    }
}

/// Result alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
