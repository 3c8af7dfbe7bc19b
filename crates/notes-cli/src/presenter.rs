//! Terminal rendering of the note list.

use std::fmt::Display;
use std::io::Write;

use chrono::{DateTime, Local, TimeZone};
use notes_core::{DisplayList, Note, Notice, NoticeLevel, Presenter};
use serde::Serialize;

const SHORT_ID_LEN: usize = 13;
const TITLE_WIDTH: usize = 28;
const PREVIEW_WIDTH: usize = 40;
const DATE_FORMAT: &str = "%b %d, %Y %H:%M";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub title: String,
    pub content: String,
    pub display_title: String,
    pub display_content: String,
    pub timestamp: i64,
    pub date: String,
    pub selected: bool,
}

/// Prints display lists to `out` and notices to stderr.
///
/// Counts renders and failures so commands can tell whether a load worked.
pub struct TerminalPresenter<'a, W: Write> {
    out: &'a mut W,
    format: OutputFormat,
    show_lists: bool,
    header: bool,
    renders: usize,
    failures: usize,
}

impl<'a, W: Write> TerminalPresenter<'a, W> {
    pub fn new(out: &'a mut W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            show_lists: true,
            header: false,
            renders: 0,
            failures: 0,
        }
    }

    /// A presenter that only reports notices, for one-shot commands.
    pub fn quiet(out: &'a mut W) -> Self {
        Self {
            show_lists: false,
            ..Self::new(out, OutputFormat::Text)
        }
    }

    /// Print a summary line before each list, for repeated renders.
    #[must_use]
    pub fn with_header(mut self) -> Self {
        self.header = true;
        self
    }

    /// Number of lists handed to this presenter, printed or not
    pub const fn render_count(&self) -> usize {
        self.renders
    }

    pub const fn failure_count(&self) -> usize {
        self.failures
    }

    /// Direct access to the output stream
    pub fn out(&mut self) -> &mut W {
        &mut *self.out
    }

    fn write_list(&mut self, list: &DisplayList) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                let items: Vec<NoteListItem> = list
                    .notes
                    .iter()
                    .enumerate()
                    .map(|(index, note)| note_to_list_item(note, list.selected == Some(index)))
                    .collect();
                let rendered = serde_json::to_string_pretty(&items).map_err(std::io::Error::other)?;
                writeln!(self.out, "{rendered}")
            }
            OutputFormat::Text => {
                if self.header {
                    let noun = if list.len() == 1 { "note" } else { "notes" };
                    writeln!(
                        self.out,
                        "-- {} {noun} at {} --",
                        list.len(),
                        Local::now().format("%H:%M:%S")
                    )?;
                }
                if list.is_empty() {
                    return writeln!(self.out, "No notes found.");
                }
                for line in format_note_lines(list) {
                    writeln!(self.out, "{line}")?;
                }
                Ok(())
            }
        }
    }
}

impl<W: Write> Presenter for TerminalPresenter<'_, W> {
    fn render(&mut self, list: &DisplayList) {
        self.renders += 1;
        if !self.show_lists {
            return;
        }
        if let Err(error) = self.write_list(list).and_then(|()| self.out.flush()) {
            tracing::warn!("Failed to write note list: {}", error);
        }
    }

    fn notify(&mut self, notice: Notice) {
        if notice.is_failure() {
            self.failures += 1;
        }
        if self.format == OutputFormat::Json && !notice.is_failure() {
            return;
        }
        eprintln!("{}", format_notice(&notice));
    }
}

pub fn format_notice(notice: &Notice) -> String {
    match notice.level {
        NoticeLevel::Success | NoticeLevel::Info => notice.message.clone(),
        NoticeLevel::Failure => format!("warning: {}", notice.message),
    }
}

pub fn format_note_lines(list: &DisplayList) -> Vec<String> {
    list.notes
        .iter()
        .enumerate()
        .map(|(index, note)| {
            let marker = if list.selected == Some(index) { '*' } else { ' ' };
            let short_id = note.id.as_str().chars().take(SHORT_ID_LEN).collect::<String>();
            let title = truncate(note.display_title(), TITLE_WIDTH);
            let preview = note_preview(note, PREVIEW_WIDTH);
            let date = format_timestamp(note.timestamp);
            format!("{marker}{short_id:<13}  {title:<28}  {date:<18}  {preview}")
        })
        .collect()
}

pub fn note_to_list_item(note: &Note, selected: bool) -> NoteListItem {
    NoteListItem {
        id: note.id.to_string(),
        title: note.title.clone(),
        content: note.content.clone(),
        display_title: note.display_title().to_string(),
        display_content: note.display_content().to_string(),
        timestamp: note.timestamp,
        date: format_timestamp(note.timestamp),
        selected,
    }
}

/// First line of the content, whitespace collapsed, truncated with an ellipsis.
pub fn note_preview(note: &Note, max_chars: usize) -> String {
    let first_line = note.display_content().lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&collapsed, max_chars)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = text.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    format_timestamp_in(timestamp_ms, &Local)
}

pub fn format_timestamp_in<Tz>(timestamp_ms: i64, zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.with_timezone(zone).format(DATE_FORMAT).to_string(),
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use notes_core::NoteId;
    use pretty_assertions::assert_eq;

    use super::*;

    fn note(id: &str, title: &str, content: &str) -> Note {
        Note {
            id: NoteId::new(id),
            title: title.to_string(),
            content: content.to_string(),
            owner_id: "u1".to_string(),
            timestamp: 0,
        }
    }

    #[test]
    fn format_timestamp_uses_month_day_year() {
        assert_eq!(format_timestamp_in(0, &Utc), "Jan 01, 1970 00:00");
        assert_eq!(
            format_timestamp_in(1_700_000_000_000, &Utc),
            "Nov 14, 2023 22:13"
        );
    }

    #[test]
    fn note_preview_truncates_with_ellipsis() {
        let note = note("1", "", "This is a very long sentence that should be shortened");
        assert_eq!(note_preview(&note, 20), "This is a very lo...");
    }

    #[test]
    fn note_preview_uses_placeholder_for_empty_content() {
        assert_eq!(note_preview(&note("1", "", ""), 20), "No content");
    }

    #[test]
    fn lines_mark_selection_and_use_placeholders() {
        let list = DisplayList {
            notes: vec![note("abc", "", "body"), note("def", "Groceries", "milk")],
            selected: Some(1),
        };
        let lines = format_note_lines(&list);
        assert!(lines[0].starts_with(" abc"));
        assert!(lines[0].contains("Untitled"));
        assert!(lines[1].starts_with("*def"));
        assert!(lines[1].contains("Groceries"));
    }

    #[test]
    fn render_writes_empty_state() {
        let mut out = Vec::new();
        let mut presenter = TerminalPresenter::new(&mut out, OutputFormat::Text);
        presenter.render(&DisplayList::default());
        assert_eq!(String::from_utf8(out).unwrap(), "No notes found.\n");
    }

    #[test]
    fn json_render_keeps_raw_and_display_fields() {
        let mut out = Vec::new();
        let mut presenter = TerminalPresenter::new(&mut out, OutputFormat::Json);
        presenter.render(&DisplayList::new(vec![note("abc", "", "")], None));

        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["title"], "");
        assert_eq!(parsed[0]["display_title"], "Untitled");
        assert_eq!(parsed[0]["display_content"], "No content");
    }

    #[test]
    fn quiet_presenter_counts_without_printing_lists() {
        let mut out = Vec::new();
        let mut presenter = TerminalPresenter::quiet(&mut out);
        presenter.render(&DisplayList::new(vec![note("abc", "t", "c")], None));
        presenter.notify(Notice::failure("Error adding note: offline"));

        assert_eq!(presenter.render_count(), 1);
        assert_eq!(presenter.failure_count(), 1);
        assert!(out.is_empty());
    }

    #[test]
    fn failure_notices_read_as_warnings() {
        assert_eq!(
            format_notice(&Notice::failure("Error loading notes: offline")),
            "warning: Error loading notes: offline"
        );
        assert_eq!(format_notice(&Notice::success("Note added")), "Note added");
    }
}
