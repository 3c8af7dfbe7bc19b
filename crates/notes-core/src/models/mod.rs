//! Data models for Notes

mod document;
mod note;
mod sort;

pub use document::{DecodedSnapshot, Document, Snapshot, SkippedDocument};
pub use note::{Note, NoteFields, NoteId, EMPTY_CONTENT_LABEL, UNTITLED_LABEL};
pub use sort::SortOrder;
