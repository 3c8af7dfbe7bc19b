//! notes-core - Core library for Notes
//!
//! This crate contains the note model, sorting and search, the auth and note
//! store seams with their hosted-backend clients, and the
//! [`NoteListCoordinator`] that keeps a signed-in user's note list in sync.

pub mod auth;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod presenter;
pub mod search;
pub mod store;
pub mod util;

#[cfg(test)]
mod test_support;

pub use coordinator::{
    CoordinatorEvent, NoteListCoordinator, SaveOutcome, WriteAction, WriteReport,
};
pub use error::{Error, Result};
pub use models::{Note, NoteFields, NoteId, SortOrder};
pub use presenter::{DisplayList, Notice, NoticeLevel, Presenter};
