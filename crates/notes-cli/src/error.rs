use std::io;

use notes_core::auth::AuthError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] notes_core::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Note title and content cannot both be empty")]
    EmptyNote,
    #[error("Note ID cannot be empty")]
    EmptyNoteId,
    #[error("Note not found for id/prefix: {0}")]
    NoteNotFound(String),
    #[error("{0}")]
    AmbiguousNoteId(String),
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Profile '{0}' has no backend configured. Run `notes config init --api-key <KEY> --project-id <ID>` or set NOTES_FIREBASE_API_KEY and NOTES_FIREBASE_PROJECT_ID."
    )]
    NotConfigured(String),
    #[error("Profile '{0}' is not signed in. Run `notes auth login --email <EMAIL> --password <PASSWORD>`.")]
    NotSignedIn(String),
    /// Already reported to the user through a notice
    #[error("command failed")]
    Reported,
}
