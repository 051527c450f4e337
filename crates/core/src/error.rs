//! Errors raised by storefront domain code.
//!
//! Catalog writes, prize tables and id parsing all report through
//! [`DomainError`]. Collaborator outages (catalog feed, state store, mail
//! transport) have their own error types in the crates that own them.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Rejected input: a product with a blank name or negative price, an
    /// empty prize table.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Shared state can no longer be trusted (a poisoned catalog lock).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Unparsable or unusable id, including an exhausted id space.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("not found")]
    NotFound,

    /// The write collides with existing data (a product id already taken).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
