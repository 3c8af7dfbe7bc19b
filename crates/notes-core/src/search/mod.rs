//! Sorting and text filtering for the note list.
//!
//! The display list is always derived in two steps: a stable sort by the
//! selected [`SortOrder`], then an optional case-insensitive substring filter
//! over title and content. Filtering never reorders, so ties keep the order the
//! sort produced.

use std::cmp::Ordering;

use crate::models::{Note, SortOrder};

/// Normalize a raw search query.
///
/// Returns `None` for an absent or blank query, which means "no filter".
/// A non-blank query is kept as typed, surrounding whitespace included.
pub fn normalize_query(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Compare two notes under `order`.
pub fn compare_notes(order: SortOrder, a: &Note, b: &Note) -> Ordering {
    match order {
        SortOrder::NewestFirst => b.timestamp.cmp(&a.timestamp),
        SortOrder::OldestFirst => a.timestamp.cmp(&b.timestamp),
        SortOrder::TitleAscending => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortOrder::TitleDescending => b.title.to_lowercase().cmp(&a.title.to_lowercase()),
    }
}

/// Return a copy of `notes` stably sorted by `order`.
#[must_use]
pub fn sort_notes(notes: &[Note], order: SortOrder) -> Vec<Note> {
    let mut sorted = notes.to_vec();
    sorted.sort_by(|a, b| compare_notes(order, a, b));
    sorted
}

/// Keep notes whose title or content contains `query`, ignoring case.
///
/// A blank query keeps everything. Otherwise the query is matched exactly as
/// given, so `" cat"` does not match `"concat"`. Input order is preserved.
#[must_use]
pub fn filter_notes(notes: Vec<Note>, query: &str) -> Vec<Note> {
    if query.trim().is_empty() {
        return notes;
    }
    let needle = query.to_lowercase();
    notes
        .into_iter()
        .filter(|note| note.matches_lowercase(&needle))
        .collect()
}

/// Sort then filter: the list that should be rendered.
#[must_use]
pub fn display_list(notes: &[Note], order: SortOrder, query: Option<&str>) -> Vec<Note> {
    let sorted = sort_notes(notes, order);
    match query {
        Some(query) => filter_notes(sorted, query),
        None => sorted,
    }
}
