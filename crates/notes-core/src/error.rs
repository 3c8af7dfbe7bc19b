//! Error types for notes-core

use thiserror::Error;

/// Result type alias using notes-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in notes-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// No authenticated user is available
    #[error("No user is signed in")]
    NotSignedIn,

    /// Note not found
    #[error("Note not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Remote document store rejected or failed a request
    #[error("Store error: {0}")]
    Store(String),

    /// A live subscription could not be established or was interrupted
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Auth error
    #[error(transparent)]
    Auth(#[from] crate::auth::AuthError),
}
