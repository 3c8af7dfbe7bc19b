//! Note store seam.
//!
//! A store holds note documents, answers owner-scoped queries, and pushes full
//! replacement snapshots to live subscribers. Writes are full-field overwrites.

mod firestore;
mod memory;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::{Document, NoteFields, NoteId, Snapshot};
use crate::Result;

pub use firestore::FirestoreNoteStore;
pub use memory::MemoryNoteStore;

/// Remote document store holding the notes collection
#[async_trait]
pub trait NoteStore: Send + Sync + 'static {
    /// Start a live query over documents whose `userId` equals `owner_id`.
    ///
    /// The first delivery is the current result set; every later delivery
    /// replaces it wholesale.
    async fn subscribe(&self, owner_id: &str) -> Result<Subscription>;

    /// One-shot query over documents whose `userId` equals `owner_id`
    async fn fetch(&self, owner_id: &str) -> Result<Snapshot>;

    /// Look up a single document
    async fn get(&self, id: &NoteId) -> Result<Option<Document>>;

    /// Create a document and return its assigned id
    async fn add(&self, fields: &NoteFields) -> Result<NoteId>;

    /// Overwrite an existing document's fields. Fails when it does not exist.
    async fn update(&self, id: &NoteId, fields: &NoteFields) -> Result<()>;

    /// Delete a document
    async fn delete(&self, id: &NoteId) -> Result<()>;
}

/// Sender half handed to whatever produces snapshots for a subscription
pub type SnapshotSender = mpsc::UnboundedSender<Result<Snapshot>>;

/// A live query. Dropping it releases the listener.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Result<Snapshot>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// A subscription fed by an external producer through the returned sender
    #[must_use]
    pub fn channel() -> (SnapshotSender, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            sender,
            Self {
                receiver,
                task: None,
            },
        )
    }

    /// A subscription fed by a background task that is aborted on drop
    #[must_use]
    pub const fn with_task(
        receiver: mpsc::UnboundedReceiver<Result<Snapshot>>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            receiver,
            task: Some(task),
        }
    }

    /// Wait for the next delivery; `None` once the producer is gone.
    pub async fn next(&mut self) -> Option<Result<Snapshot>> {
        self.receiver.recv().await
    }

    /// Release the listener
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.receiver.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
