//! Note model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::util::unix_millis_now;

/// Label shown in place of an empty title. Never persisted.
pub const UNTITLED_LABEL: &str = "Untitled";

/// Label shown in place of empty content. Never persisted.
pub const EMPTY_CONTENT_LABEL: &str = "No content";

/// Opaque identifier assigned by the note store on creation.
///
/// An empty id marks a note that has not been persisted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NoteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("Note ID cannot be empty".to_string()));
        }
        if trimmed.contains('/') {
            return Err(Error::InvalidInput(format!("Invalid note ID: {trimmed}")));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A note owned by a single user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Store-assigned identifier
    pub id: NoteId,
    /// Free-form title, may be empty
    pub title: String,
    /// Free-form body, may be empty
    pub content: String,
    /// Id of the user who created the note
    pub owner_id: String,
    /// Last write time (Unix ms)
    pub timestamp: i64,
}

impl Note {
    /// Title to render, substituting a placeholder for an empty title
    #[must_use]
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            UNTITLED_LABEL
        } else {
            &self.title
        }
    }

    /// Content to render, substituting a placeholder for empty content
    #[must_use]
    pub fn display_content(&self) -> &str {
        if self.content.is_empty() {
            EMPTY_CONTENT_LABEL
        } else {
            &self.content
        }
    }

    /// Case-insensitive substring match on title or content.
    ///
    /// `needle` must already be lowercased.
    #[must_use]
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.content.to_lowercase().contains(needle)
    }
}

/// The writable fields of a note, as sent to the store on create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFields {
    pub title: String,
    pub content: String,
    pub owner_id: String,
    pub timestamp: i64,
}

impl NoteFields {
    /// Build fields for `owner_id` stamped with the current time.
    ///
    /// Title and content are trimmed. Returns `None` when both end up empty.
    #[must_use]
    pub fn new(owner_id: impl Into<String>, title: &str, content: &str) -> Option<Self> {
        let title = title.trim();
        let content = content.trim();
        if title.is_empty() && content.is_empty() {
            return None;
        }

        Some(Self {
            title: title.to_string(),
            content: content.to_string(),
            owner_id: owner_id.into(),
            timestamp: unix_millis_now(),
        })
    }

    /// Field map using the store's document field names
    #[must_use]
    pub fn to_document_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("title".to_string(), Value::from(self.title.clone()));
        fields.insert("content".to_string(), Value::from(self.content.clone()));
        fields.insert("userId".to_string(), Value::from(self.owner_id.clone()));
        fields.insert("timestamp".to_string(), Value::from(self.timestamp));
        fields
    }
}
