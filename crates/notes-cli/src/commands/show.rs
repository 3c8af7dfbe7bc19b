use std::io::{self, Write};
use std::sync::Arc;

use notes_core::auth::AuthProvider;
use notes_core::store::NoteStore;
use notes_core::NoteListCoordinator;

use crate::commands::common::{load_notes, open_backend, resolve_note_id};
use crate::error::CliError;
use crate::presenter::{format_timestamp, note_to_list_item, OutputFormat, TerminalPresenter};

pub async fn run_show(global_profile: Option<&str>, id: &str, as_json: bool) -> Result<(), CliError> {
    let backend = open_backend(global_profile).await?;
    let format = if as_json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    show_note(
        backend.store,
        backend.auth.provider(),
        id,
        format,
        &mut io::stdout(),
    )
    .await
}

pub async fn show_note<S: NoteStore, W: Write>(
    store: Arc<S>,
    auth: &dyn AuthProvider,
    note_query: &str,
    format: OutputFormat,
    out: &mut W,
) -> Result<(), CliError> {
    let mut coordinator = NoteListCoordinator::new(store, auth, TerminalPresenter::quiet(out))?;
    load_notes(&mut coordinator).await?;

    let id = resolve_note_id(coordinator.notes(), note_query)?;
    let note = coordinator.load_note(&id).await.ok_or(CliError::Reported)?;

    let out = coordinator.presenter_mut().out();
    match format {
        OutputFormat::Json => {
            let item = note_to_list_item(&note, false);
            writeln!(out, "{}", serde_json::to_string_pretty(&item)?)?;
        }
        OutputFormat::Text => {
            writeln!(out, "{}", note.display_title())?;
            writeln!(out, "{}  {}", note.id, format_timestamp(note.timestamp))?;
            writeln!(out)?;
            writeln!(out, "{}", note.display_content())?;
        }
    }
    Ok(())
}
