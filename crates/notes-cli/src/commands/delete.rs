use std::io::{self, Write};
use std::sync::Arc;

use notes_core::auth::AuthProvider;
use notes_core::store::NoteStore;
use notes_core::{NoteId, NoteListCoordinator, SaveOutcome};

use crate::commands::common::{load_notes, open_backend, resolve_note_id, settle_single};
use crate::error::CliError;
use crate::presenter::TerminalPresenter;

pub async fn run_delete(global_profile: Option<&str>, id: &str) -> Result<(), CliError> {
    let backend = open_backend(global_profile).await?;
    delete_note(backend.store, backend.auth.provider(), id, &mut io::stdout()).await?;
    Ok(())
}

pub async fn delete_note<S: NoteStore, W: Write>(
    store: Arc<S>,
    auth: &dyn AuthProvider,
    note_query: &str,
    out: &mut W,
) -> Result<NoteId, CliError> {
    let mut coordinator = NoteListCoordinator::new(store, auth, TerminalPresenter::quiet(out))?;
    load_notes(&mut coordinator).await?;

    let id = resolve_note_id(coordinator.notes(), note_query)?;
    coordinator.select(&id);
    if coordinator.delete_selected() != SaveOutcome::Submitted {
        return Err(CliError::NoteNotFound(id.to_string()));
    }
    settle_single(&mut coordinator).await?;

    writeln!(coordinator.presenter_mut().out(), "{id}")?;
    Ok(id)
}
