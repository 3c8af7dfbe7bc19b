use std::io::{self, Write};
use std::sync::Arc;

use notes_core::auth::AuthProvider;
use notes_core::store::NoteStore;
use notes_core::{NoteId, NoteListCoordinator, SaveOutcome};

use crate::commands::common::{open_backend, resolve_new_note_input, settle_single};
use crate::error::CliError;
use crate::presenter::TerminalPresenter;

pub async fn run_add(
    global_profile: Option<&str>,
    title: Option<String>,
    content: Option<String>,
) -> Result<(), CliError> {
    let (title, content) = resolve_new_note_input(title, content)?;
    let backend = open_backend(global_profile).await?;
    add_note(
        backend.store,
        backend.auth.provider(),
        &title,
        &content,
        &mut io::stdout(),
    )
    .await?;
    Ok(())
}

pub async fn add_note<S: NoteStore, W: Write>(
    store: Arc<S>,
    auth: &dyn AuthProvider,
    title: &str,
    content: &str,
    out: &mut W,
) -> Result<NoteId, CliError> {
    let mut coordinator = NoteListCoordinator::new(store, auth, TerminalPresenter::quiet(out))?;
    if coordinator.create_note(title, content) == SaveOutcome::Rejected {
        return Err(CliError::EmptyNote);
    }

    let report = settle_single(&mut coordinator).await?;
    let id = report.note_id.ok_or(CliError::Reported)?;
    writeln!(coordinator.presenter_mut().out(), "{id}")?;
    Ok(id)
}
