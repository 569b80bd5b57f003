//! # AppError
//!
//! Centralized error handling for the forum.
//! Maps domain and storage failures to actionable error types.

use thiserror::Error;

/// The primary error type for all rf-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Resource not found (e.g., Forum by slug, Topic by id)
    #[error("{0} not found: {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., empty title, unknown state code, bad sort field)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// The caller could not be identified as an author
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Infrastructure failure (e.g., database unavailable)
    #[error("internal service error: {0}")]
    Internal(String),

    /// Resource already exists (e.g., duplicate forum or topic slug)
    #[error("conflict: {0}")]
    Conflict(String),
}

impl AppError {
    pub fn not_found(kind: &str, key: impl ToString) -> Self {
        AppError::NotFound(kind.to_string(), key.to_string())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }
}

/// A specialized Result type for forum logic.
pub type Result<T> = std::result::Result<T, AppError>;
