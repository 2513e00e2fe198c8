//! # AppError
//!
//! Centralized error handling for the news board.
//! Adapters translate their library errors into these variants at the port
//! boundary; the HTTP layer maps each variant to a status code.

use thiserror::Error;

/// Message returned for every rejected registration, whatever the cause.
pub const REQUEST_ISSUE: &str = "There was an issue with your request";

/// The primary error type for all domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Resource not found (e.g., Newspost, or an empty full listing)
    #[error("{0} not found")]
    NotFound(String),

    /// The operation requires a logged-in caller
    #[error("authentication required")]
    AuthenticationRequired,

    /// Authenticated, but the named permission is not granted
    #[error("forbidden: missing permission {0}")]
    Forbidden(String),

    /// Input rejected (password mismatch, duplicate username, bad text)
    #[error("{0}")]
    ValidationFailed(String),

    /// The bot check did not pass
    #[error("Issue with your request")]
    VerificationFailed,

    /// The verification service could not be reached or answered garbage
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A configured permission codename does not exist in the store
    #[error("unknown permission: {0}")]
    UnknownPermission(String),

    /// Login with an unknown username or wrong password
    #[error("Incorrect Username or Password")]
    InvalidCredentials,

    /// Resource already exists (e.g., duplicate username)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., DB down)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        AppError::NotFound(what.to_string())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// A specialized Result type for domain logic.
pub type Result<T> = std::result::Result<T, AppError>;
