//! Store documents and their mapping onto [`Note`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::note::{Note, NoteId};

/// A raw document as delivered by a note store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Value of the `userId` field, if present and a string
    #[must_use]
    pub fn owner_id(&self) -> Option<&str> {
        self.fields.get("userId").and_then(Value::as_str)
    }

    /// Map this document onto a note.
    ///
    /// Absent or null fields take their defaults; a field with the wrong shape
    /// is an error.
    pub fn to_note(&self) -> Result<Note, String> {
        if self.id.trim().is_empty() {
            return Err("document has no id".to_string());
        }

        let record: NoteRecord = serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|error| error.to_string())?;

        Ok(Note {
            id: NoteId::new(self.id.clone()),
            title: record.title.unwrap_or_default(),
            content: record.content.unwrap_or_default(),
            owner_id: record.user_id.unwrap_or_default(),
            timestamp: record.timestamp.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NoteRecord {
    title: Option<String>,
    content: Option<String>,
    #[serde(rename = "userId")]
    user_id: Option<String>,
    timestamp: Option<i64>,
}

/// A full replacement set of documents, superseding any earlier snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub documents: Vec<Document>,
}

/// A document dropped while decoding a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub id: String,
    pub reason: String,
}

/// Result of decoding a snapshot: the usable notes plus whatever was skipped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedSnapshot {
    pub notes: Vec<Note>,
    pub skipped: Vec<SkippedDocument>,
}

impl Snapshot {
    #[must_use]
    pub const fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Decode every document, skipping malformed ones individually.
    #[must_use]
    pub fn decode(&self) -> DecodedSnapshot {
        let mut decoded = DecodedSnapshot::default();
        for document in &self.documents {
            match document.to_note() {
                Ok(note) => decoded.notes.push(note),
                Err(reason) => decoded.skipped.push(SkippedDocument {
                    id: document.id.clone(),
                    reason,
                }),
            }
        }
        decoded
    }
}
