//! Note list coordination.
//!
//! [`NoteListCoordinator`] owns the signed-in user's cached notes, keeps them
//! in sync with a [`NoteStore`] subscription, and derives the list handed to a
//! [`Presenter`]. Writes go to the store and are never merged locally: the
//! cache only changes when the store delivers a new snapshot.
//!
//! All state lives on the task that owns the coordinator. Store writes run as
//! spawned tasks and report back through [`CoordinatorEvent`]s, which the
//! owner pumps with [`NoteListCoordinator::next_event`] and
//! [`NoteListCoordinator::handle_event`] (or [`NoteListCoordinator::settle`]).

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::auth::AuthProvider;
use crate::models::{Note, NoteFields, NoteId, Snapshot, SortOrder};
use crate::presenter::{DisplayList, Notice, Presenter};
use crate::search;
use crate::store::{NoteStore, Subscription};
use crate::{Error, Result};

const SELECT_FIRST: &str = "Please select a note first";

/// A store write submitted by the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteAction {
    Create,
    Update(NoteId),
    Delete(NoteId),
}

impl WriteAction {
    const fn success_message(&self) -> &'static str {
        match self {
            Self::Create => "Note added",
            Self::Update(_) => "Note updated",
            Self::Delete(_) => "Note deleted",
        }
    }

    const fn failure_prefix(&self) -> &'static str {
        match self {
            Self::Create => "Error adding note",
            Self::Update(_) => "Error updating note",
            Self::Delete(_) => "Error deleting note",
        }
    }
}

/// What happened to a save request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The write was handed to the store
    Submitted,
    /// Title and content were both blank; nothing was written
    Rejected,
    /// The request targeted the selection but nothing is selected
    NoSelection,
}

/// Something the coordinator must react to
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    /// The live subscription delivered a full replacement snapshot
    Snapshot(Snapshot),
    /// The live subscription reported a delivery failure
    SubscriptionFailed(String),
    /// The live subscription's producer went away
    SubscriptionClosed,
    /// A submitted write finished. On success, carries the affected note id.
    WriteCompleted {
        action: WriteAction,
        result: std::result::Result<NoteId, String>,
    },
}

/// Outcome of one completed write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub action: WriteAction,
    /// Affected note; for a create, the id the store assigned
    pub note_id: Option<NoteId>,
    pub error: Option<String>,
}

impl WriteReport {
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

struct WriteCompletion {
    action: WriteAction,
    result: std::result::Result<NoteId, String>,
}

/// Keeps one user's note list in sync and renders it.
pub struct NoteListCoordinator<S: NoteStore, P: Presenter> {
    store: Arc<S>,
    presenter: P,
    owner_id: String,
    raw_notes: Vec<Note>,
    sort_order: SortOrder,
    filter_query: Option<String>,
    selected_note_id: Option<NoteId>,
    subscription: Option<Subscription>,
    completions_tx: mpsc::UnboundedSender<WriteCompletion>,
    completions_rx: mpsc::UnboundedReceiver<WriteCompletion>,
    pending_writes: usize,
}

impl<S: NoteStore, P: Presenter> NoteListCoordinator<S, P> {
    /// Create a coordinator for the currently signed-in user.
    ///
    /// Fails with [`Error::NotSignedIn`] when `auth` has no user.
    pub fn new(store: Arc<S>, auth: &dyn AuthProvider, presenter: P) -> Result<Self> {
        let owner_id = auth
            .current_user_id()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(Error::NotSignedIn)?;

        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Ok(Self {
            store,
            presenter,
            owner_id,
            raw_notes: Vec::new(),
            sort_order: SortOrder::default(),
            filter_query: None,
            selected_note_id: None,
            subscription: None,
            completions_tx,
            completions_rx,
            pending_writes: 0,
        })
    }

    /// Start with `order` instead of the default, without rendering or notifying
    #[must_use]
    pub fn with_sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = order;
        self
    }

    /// Start with a filter, without rendering or notifying
    #[must_use]
    pub fn with_filter(mut self, query: Option<&str>) -> Self {
        self.filter_query = search::normalize_query(query);
        self
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub const fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn filter_query(&self) -> Option<&str> {
        self.filter_query.as_deref()
    }

    /// Cached notes as last delivered, unsorted
    pub fn notes(&self) -> &[Note] {
        &self.raw_notes
    }

    pub const fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub const fn is_listening(&self) -> bool {
        self.subscription.is_some()
    }

    pub const fn pending_writes(&self) -> usize {
        self.pending_writes
    }

    /// Open the live subscription for the owner.
    ///
    /// A failure is reported as a notice and leaves the coordinator idle.
    pub async fn start(&mut self) {
        match self.store.subscribe(&self.owner_id).await {
            Ok(subscription) => {
                tracing::info!("Listening for notes of {}", self.owner_id);
                self.subscription = Some(subscription);
            }
            Err(error) => {
                tracing::warn!("Failed to set up note listener: {}", error);
                self.presenter
                    .notify(Notice::failure(format!("Error setting up listener: {error}")));
            }
        }
    }

    /// Re-query the owner's notes once and apply the result.
    ///
    /// Returns `false` when the store could not be queried; the failure has
    /// already been shown as a notice.
    pub async fn refresh(&mut self) -> bool {
        match self.store.fetch(&self.owner_id).await {
            Ok(snapshot) => {
                self.apply_snapshot(&snapshot);
                true
            }
            Err(error) => {
                tracing::warn!("Failed to load notes: {}", error);
                self.presenter
                    .notify(Notice::failure(format!("Error loading notes: {error}")));
                false
            }
        }
    }

    /// Decode a store snapshot and make it the new cache.
    ///
    /// Malformed documents are dropped one by one; the rest still apply.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        let decoded = snapshot.decode();
        for skipped in &decoded.skipped {
            tracing::warn!("Skipping malformed note {}: {}", skipped.id, skipped.reason);
        }
        if !decoded.skipped.is_empty() {
            self.presenter.notify(Notice::failure(format!(
                "Error processing notes: skipped {} malformed document(s)",
                decoded.skipped.len()
            )));
        }
        self.on_remote_snapshot(decoded.notes);
    }

    /// Replace the cache wholesale and re-render.
    pub fn on_remote_snapshot(&mut self, notes: Vec<Note>) {
        tracing::debug!("Received {} notes", notes.len());
        self.raw_notes = notes;
        if let Some(selected) = &self.selected_note_id {
            if !self.raw_notes.iter().any(|note| &note.id == selected) {
                self.selected_note_id = None;
            }
        }
        self.render();
    }

    pub fn set_sort_order(&mut self, order: SortOrder) {
        self.sort_order = order;
        self.render();
        self.presenter
            .notify(Notice::info(format!("Sorted by {}", order.label())));
    }

    /// Set or clear the text filter. Blank clears it.
    pub fn set_filter(&mut self, query: Option<&str>) {
        self.filter_query = search::normalize_query(query);
        let shown = self.render();
        if let Some(query) = &self.filter_query {
            let noun = if shown == 1 { "note" } else { "notes" };
            self.presenter
                .notify(Notice::info(format!("{shown} {noun} match \"{query}\"")));
        }
    }

    /// Sorted then filtered notes. Empty means the empty state.
    pub fn compute_display_list(&self) -> Vec<Note> {
        search::display_list(
            &self.raw_notes,
            self.sort_order,
            self.filter_query.as_deref(),
        )
    }

    /// The display list with the selection resolved to a row
    pub fn display_list(&self) -> DisplayList {
        DisplayList::new(self.compute_display_list(), self.selected_note_id.as_ref())
    }

    /// Submit a new note.
    ///
    /// Outside a Tokio runtime the write fails at once with a failure notice.
    pub fn create_note(&mut self, title: &str, content: &str) -> SaveOutcome {
        let Some(fields) = NoteFields::new(self.owner_id.clone(), title, content) else {
            return SaveOutcome::Rejected;
        };

        let store = Arc::clone(&self.store);
        self.submit(WriteAction::Create, async move { store.add(&fields).await });
        SaveOutcome::Submitted
    }

    /// Overwrite an existing note.
    pub fn update_note(&mut self, id: &NoteId, title: &str, content: &str) -> SaveOutcome {
        let Some(fields) = NoteFields::new(self.owner_id.clone(), title, content) else {
            return SaveOutcome::Rejected;
        };

        let store = Arc::clone(&self.store);
        let target = id.clone();
        self.submit(WriteAction::Update(id.clone()), async move {
            store.update(&target, &fields).await.map(|()| target)
        });
        SaveOutcome::Submitted
    }

    /// Remove a note.
    pub fn delete_note(&mut self, id: &NoteId) {
        let store = Arc::clone(&self.store);
        let target = id.clone();
        self.submit(WriteAction::Delete(id.clone()), async move {
            store.delete(&target).await.map(|()| target)
        });
    }

    /// Select a cached note. Returns `false` when `id` is not cached.
    pub fn select(&mut self, id: &NoteId) -> bool {
        if !self.raw_notes.iter().any(|note| &note.id == id) {
            return false;
        }
        self.selected_note_id = Some(id.clone());
        self.render();
        true
    }

    pub fn deselect(&mut self) {
        if self.selected_note_id.take().is_some() {
            self.render();
        }
    }

    pub fn selected_note(&self) -> Option<&Note> {
        let selected = self.selected_note_id.as_ref()?;
        self.raw_notes.iter().find(|note| &note.id == selected)
    }

    /// Read the selected note fresh from the store, e.g. to prefill an editor.
    pub async fn load_selected(&mut self) -> Option<Note> {
        let Some(id) = self.selected_note_id.clone() else {
            self.presenter.notify(Notice::info(SELECT_FIRST));
            return None;
        };
        self.load_note(&id).await
    }

    /// Read one note fresh from the store. Failures become notices.
    pub async fn load_note(&mut self, id: &NoteId) -> Option<Note> {
        let loaded = match self.store.get(id).await {
            Ok(Some(document)) => document.to_note().map_err(|reason| {
                Error::Store(format!("note {id} could not be read: {reason}"))
            }),
            Ok(None) => Err(Error::NotFound(id.to_string())),
            Err(error) => Err(error),
        };

        match loaded {
            Ok(note) => Some(note),
            Err(error) => {
                tracing::warn!("Failed to load note {}: {}", id, error);
                self.presenter
                    .notify(Notice::failure(format!("Error loading note: {error}")));
                None
            }
        }
    }

    /// Save new text for the selected note.
    pub fn edit_selected(&mut self, title: &str, content: &str) -> SaveOutcome {
        match self.selected_note_id.clone() {
            Some(id) => self.update_note(&id, title, content),
            None => {
                self.presenter.notify(Notice::info(SELECT_FIRST));
                SaveOutcome::NoSelection
            }
        }
    }

    /// Delete the selected note.
    pub fn delete_selected(&mut self) -> SaveOutcome {
        match self.selected_note_id.clone() {
            Some(id) => {
                self.delete_note(&id);
                SaveOutcome::Submitted
            }
            None => {
                self.presenter.notify(Notice::info(SELECT_FIRST));
                SaveOutcome::NoSelection
            }
        }
    }

    /// Wait for the next event.
    ///
    /// Returns `None` when there is nothing left to wait for: no live
    /// subscription and no write in flight.
    pub async fn next_event(&mut self) -> Option<CoordinatorEvent> {
        let listening = self.subscription.is_some();
        let writing = self.pending_writes > 0;
        if !listening && !writing {
            return None;
        }

        tokio::select! {
            delivery = next_delivery(&mut self.subscription), if listening => {
                Some(match delivery {
                    Some(Ok(snapshot)) => CoordinatorEvent::Snapshot(snapshot),
                    Some(Err(error)) => CoordinatorEvent::SubscriptionFailed(error.to_string()),
                    None => CoordinatorEvent::SubscriptionClosed,
                })
            }
            completion = self.completions_rx.recv(), if writing => {
                completion.map(|completion| CoordinatorEvent::WriteCompleted {
                    action: completion.action,
                    result: completion.result,
                })
            }
        }
    }

    /// React to an event. Returns a report when the event completed a write.
    pub fn handle_event(&mut self, event: CoordinatorEvent) -> Option<WriteReport> {
        match event {
            CoordinatorEvent::Snapshot(snapshot) => {
                self.apply_snapshot(&snapshot);
                None
            }
            CoordinatorEvent::SubscriptionFailed(message) => {
                tracing::warn!("Note listener failed: {}", message);
                self.presenter
                    .notify(Notice::failure(format!("Error loading notes: {message}")));
                None
            }
            CoordinatorEvent::SubscriptionClosed => {
                tracing::warn!("Note listener closed by the store");
                self.subscription = None;
                None
            }
            CoordinatorEvent::WriteCompleted { action, result } => {
                Some(self.on_write_completed(action, result))
            }
        }
    }

    /// Pump events until every in-flight write has completed.
    pub async fn settle(&mut self) -> Vec<WriteReport> {
        let mut reports = Vec::new();
        while self.pending_writes > 0 {
            let Some(event) = self.next_event().await else {
                break;
            };
            if let Some(report) = self.handle_event(event) {
                reports.push(report);
            }
        }
        reports
    }

    /// Release the live subscription.
    pub fn shutdown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.close();
            tracing::debug!("Released note listener for {}", self.owner_id);
        }
    }

    /// Release the subscription, then sign out of `auth`.
    pub fn sign_out(&mut self, auth: &dyn AuthProvider) -> bool {
        self.shutdown();
        match auth.sign_out() {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!("Sign out failed: {}", error);
                self.presenter
                    .notify(Notice::failure(format!("Error logging out: {error}")));
                false
            }
        }
    }

    fn submit<F>(&mut self, action: WriteAction, write: F)
    where
        F: Future<Output = Result<NoteId>> + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.pending_writes += 1;
            self.on_write_completed(action, Err("no async runtime available".to_string()));
            return;
        };

        tracing::debug!("Submitting {:?}", action);
        self.pending_writes += 1;
        let completions = self.completions_tx.clone();
        runtime.spawn(async move {
            let result = write.await.map_err(|error| error.to_string());
            let _ = completions.send(WriteCompletion { action, result });
        });
    }

    fn on_write_completed(
        &mut self,
        action: WriteAction,
        result: std::result::Result<NoteId, String>,
    ) -> WriteReport {
        self.pending_writes = self.pending_writes.saturating_sub(1);

        match result {
            Ok(note_id) => {
                let clears_selection = match &action {
                    WriteAction::Create => false,
                    WriteAction::Update(_) => true,
                    WriteAction::Delete(id) => self.selected_note_id.as_ref() == Some(id),
                };
                if clears_selection && self.selected_note_id.take().is_some() {
                    self.render();
                }
                self.presenter.notify(Notice::success(action.success_message()));
                WriteReport {
                    action,
                    note_id: Some(note_id),
                    error: None,
                }
            }
            Err(message) => {
                tracing::warn!("{:?} failed: {}", action, message);
                self.presenter.notify(Notice::failure(format!(
                    "{}: {message}",
                    action.failure_prefix()
                )));
                let note_id = match &action {
                    WriteAction::Create => None,
                    WriteAction::Update(id) | WriteAction::Delete(id) => Some(id.clone()),
                };
                WriteReport {
                    action,
                    note_id,
                    error: Some(message),
                }
            }
        }
    }

    fn render(&mut self) -> usize {
        let list = self.display_list();
        self.presenter.render(&list);
        list.len()
    }
}

impl<S: NoteStore, P: Presenter> Drop for NoteListCoordinator<S, P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn next_delivery(subscription: &mut Option<Subscription>) -> Option<Result<Snapshot>> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}
