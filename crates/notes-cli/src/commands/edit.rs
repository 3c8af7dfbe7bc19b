use std::io::{self, Write};
use std::sync::Arc;

use notes_core::auth::AuthProvider;
use notes_core::store::NoteStore;
use notes_core::{Note, NoteId, NoteListCoordinator, SaveOutcome};

use crate::commands::common::{
    capture_editor_input_with_initial, join_editor_text, load_notes, open_backend,
    resolve_note_id, settle_single, split_editor_text,
};
use crate::error::CliError;
use crate::presenter::TerminalPresenter;

pub async fn run_edit(
    global_profile: Option<&str>,
    id: &str,
    title: Option<String>,
    content: Option<String>,
) -> Result<(), CliError> {
    let backend = open_backend(global_profile).await?;
    let interactive = title.is_none() && content.is_none();

    edit_note(
        backend.store,
        backend.auth.provider(),
        id,
        |current| {
            if interactive {
                edit_in_editor(current)
            } else {
                Ok(merge_edits(current, title, content))
            }
        },
        &mut io::stdout(),
    )
    .await?;
    Ok(())
}

/// Resolve `note_query`, load the note fresh, and save what `edit` returns.
pub async fn edit_note<S, W, F>(
    store: Arc<S>,
    auth: &dyn AuthProvider,
    note_query: &str,
    edit: F,
    out: &mut W,
) -> Result<NoteId, CliError>
where
    S: NoteStore,
    W: Write,
    F: FnOnce(&Note) -> Result<(String, String), CliError>,
{
    let mut coordinator = NoteListCoordinator::new(store, auth, TerminalPresenter::quiet(out))?;
    load_notes(&mut coordinator).await?;

    let id = resolve_note_id(coordinator.notes(), note_query)?;
    coordinator.select(&id);
    let current = coordinator
        .load_selected()
        .await
        .ok_or(CliError::Reported)?;

    let (title, content) = edit(&current)?;
    if title.trim() == current.title && content.trim() == current.content {
        writeln!(coordinator.presenter_mut().out(), "{id}")?;
        return Ok(id);
    }

    match coordinator.edit_selected(&title, &content) {
        SaveOutcome::Submitted => {}
        SaveOutcome::Rejected => return Err(CliError::EmptyNote),
        SaveOutcome::NoSelection => return Err(CliError::NoteNotFound(id.to_string())),
    }
    settle_single(&mut coordinator).await?;

    writeln!(coordinator.presenter_mut().out(), "{id}")?;
    Ok(id)
}

/// Apply flag overrides on top of the current note.
pub fn merge_edits(current: &Note, title: Option<String>, content: Option<String>) -> (String, String) {
    (
        title.unwrap_or_else(|| current.title.clone()),
        content.unwrap_or_else(|| current.content.clone()),
    )
}

fn edit_in_editor(current: &Note) -> Result<(String, String), CliError> {
    let initial = join_editor_text(&current.title, &current.content);
    let edited = capture_editor_input_with_initial(&initial)?.ok_or(CliError::EmptyNote)?;
    Ok(split_editor_text(&edited))
}
