//! Presentation seam: what the coordinator hands to whatever draws the list.

use crate::models::{Note, NoteId};

/// Severity of a transient user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Failure,
    Info,
}

/// A transient message about a user-initiated action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Failure,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self.level, NoticeLevel::Failure)
    }
}

/// The rendered list plus the selected row, resolved from the selected id at
/// render time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayList {
    pub notes: Vec<Note>,
    pub selected: Option<usize>,
}

impl DisplayList {
    #[must_use]
    pub fn new(notes: Vec<Note>, selected_id: Option<&NoteId>) -> Self {
        let selected =
            selected_id.and_then(|id| notes.iter().position(|note| &note.id == id));
        Self { notes, selected }
    }

    /// Empty list means "show the empty state"
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    #[must_use]
    pub fn selected_note(&self) -> Option<&Note> {
        self.selected.and_then(|index| self.notes.get(index))
    }
}

/// Receives display lists and notices from the coordinator.
pub trait Presenter {
    /// Draw the current display list
    fn render(&mut self, list: &DisplayList);

    /// Show a transient message
    fn notify(&mut self, notice: Notice);
}

/// Presenter that records everything it receives.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub renders: Vec<DisplayList>,
    pub notices: Vec<Notice>,
}

impl RecordingPresenter {
    #[must_use]
    pub fn last_render(&self) -> Option<&DisplayList> {
        self.renders.last()
    }

    #[must_use]
    pub fn last_notice(&self) -> Option<&Notice> {
        self.notices.last()
    }

    #[must_use]
    pub fn failures(&self) -> Vec<&Notice> {
        self.notices.iter().filter(|notice| notice.is_failure()).collect()
    }
}

impl Presenter for RecordingPresenter {
    fn render(&mut self, list: &DisplayList) {
        self.renders.push(list.clone());
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}
