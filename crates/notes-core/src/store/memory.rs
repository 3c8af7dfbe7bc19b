//! In-process note store.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{NoteStore, SnapshotSender, Subscription};
use crate::models::{Document, NoteFields, NoteId, Snapshot};
use crate::{Error, Result};

/// Note store kept entirely in memory.
///
/// Every write pushes a fresh snapshot to each live subscriber whose owner it
/// matches. Subscribers that have gone away are pruned on the next push.
/// Failures can be injected to exercise error paths.
#[derive(Clone, Default)]
pub struct MemoryNoteStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    documents: BTreeMap<String, Document>,
    subscribers: Vec<(String, SnapshotSender)>,
    write_failure: Option<String>,
    subscribe_failure: Option<String>,
    fetch_failure: Option<String>,
}

impl MemoryState {
    fn snapshot_for(&self, owner_id: &str) -> Snapshot {
        Snapshot::new(
            self.documents
                .values()
                .filter(|document| document.owner_id() == Some(owner_id))
                .cloned()
                .collect(),
        )
    }

    fn publish(&mut self) {
        let snapshots: Vec<Snapshot> = self
            .subscribers
            .iter()
            .map(|(owner_id, _)| self.snapshot_for(owner_id))
            .collect();

        let mut delivered = snapshots.into_iter();
        self.subscribers.retain(|(_, sender)| {
            delivered
                .next()
                .is_some_and(|snapshot| sender.send(Ok(snapshot)).is_ok())
        });
    }

    fn check_write(&self) -> Result<()> {
        match &self.write_failure {
            Some(message) => Err(Error::Store(message.clone())),
            None => Ok(()),
        }
    }
}

impl MemoryNoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw document as-is, bypassing field validation.
    pub fn insert_document(&self, document: Document) -> Result<()> {
        let mut state = self.state()?;
        state.documents.insert(document.id.clone(), document);
        state.publish();
        Ok(())
    }

    /// Make every subsequent write fail with `message`, or succeed again with `None`.
    pub fn fail_writes(&self, message: Option<&str>) -> Result<()> {
        self.state()?.write_failure = message.map(ToString::to_string);
        Ok(())
    }

    /// Make every subsequent subscribe call fail with `message`.
    pub fn fail_subscriptions(&self, message: Option<&str>) -> Result<()> {
        self.state()?.subscribe_failure = message.map(ToString::to_string);
        Ok(())
    }

    /// Make every subsequent one-shot query fail with `message`.
    pub fn fail_fetches(&self, message: Option<&str>) -> Result<()> {
        self.state()?.fetch_failure = message.map(ToString::to_string);
        Ok(())
    }

    /// Deliver a delivery error to every live subscriber.
    pub fn interrupt_subscribers(&self, message: &str) -> Result<()> {
        let mut state = self.state()?;
        state.subscribers.retain(|(_, sender)| {
            sender
                .send(Err(Error::Subscription(message.to_string())))
                .is_ok()
        });
        Ok(())
    }

    /// Number of stored documents across all owners
    pub fn document_count(&self) -> Result<usize> {
        Ok(self.state()?.documents.len())
    }

    /// Number of subscribers still listening
    pub fn subscriber_count(&self) -> Result<usize> {
        let mut state = self.state()?;
        state.subscribers.retain(|(_, sender)| !sender.is_closed());
        Ok(state.subscribers.len())
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.inner
            .lock()
            .map_err(|error| Error::Store(format!("memory store poisoned: {error}")))
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn subscribe(&self, owner_id: &str) -> Result<Subscription> {
        let mut state = self.state()?;
        if let Some(message) = &state.subscribe_failure {
            return Err(Error::Subscription(message.clone()));
        }

        let (sender, subscription) = Subscription::channel();
        sender
            .send(Ok(state.snapshot_for(owner_id)))
            .map_err(|_| Error::Subscription("subscriber closed".to_string()))?;
        state.subscribers.push((owner_id.to_string(), sender));
        tracing::debug!("memory store: subscribed {}", owner_id);
        Ok(subscription)
    }

    async fn fetch(&self, owner_id: &str) -> Result<Snapshot> {
        let state = self.state()?;
        if let Some(message) = &state.fetch_failure {
            return Err(Error::Store(message.clone()));
        }
        Ok(state.snapshot_for(owner_id))
    }

    async fn get(&self, id: &NoteId) -> Result<Option<Document>> {
        Ok(self.state()?.documents.get(id.as_str()).cloned())
    }

    async fn add(&self, fields: &NoteFields) -> Result<NoteId> {
        let mut state = self.state()?;
        state.check_write()?;

        let id = Uuid::now_v7().simple().to_string();
        state.documents.insert(
            id.clone(),
            Document::new(id.clone(), fields.to_document_fields()),
        );
        state.publish();
        Ok(NoteId::new(id))
    }

    async fn update(&self, id: &NoteId, fields: &NoteFields) -> Result<()> {
        let mut state = self.state()?;
        state.check_write()?;

        let document = state
            .documents
            .get_mut(id.as_str())
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        document.fields.extend(fields.to_document_fields());
        state.publish();
        Ok(())
    }

    async fn delete(&self, id: &NoteId) -> Result<()> {
        let mut state = self.state()?;
        state.check_write()?;

        if state.documents.remove(id.as_str()).is_some() {
            state.publish();
        }
        Ok(())
    }
}
