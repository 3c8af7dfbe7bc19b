use std::io::{self, Write};
use std::sync::Arc;

use notes_core::auth::AuthProvider;
use notes_core::store::NoteStore;
use notes_core::{NoteListCoordinator, SortOrder};

use crate::commands::common::{load_notes, open_backend};
use crate::error::CliError;
use crate::presenter::{OutputFormat, TerminalPresenter};

pub async fn run_list(
    global_profile: Option<&str>,
    sort: SortOrder,
    search: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    let backend = open_backend(global_profile).await?;
    let format = if as_json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    list_notes(
        backend.store,
        backend.auth.provider(),
        sort,
        search,
        format,
        &mut io::stdout(),
    )
    .await
}

pub async fn list_notes<S: NoteStore, W: Write>(
    store: Arc<S>,
    auth: &dyn AuthProvider,
    sort: SortOrder,
    search: Option<&str>,
    format: OutputFormat,
    out: &mut W,
) -> Result<(), CliError> {
    let presenter = TerminalPresenter::new(out, format);
    let mut coordinator = NoteListCoordinator::new(store, auth, presenter)?
        .with_sort_order(sort)
        .with_filter(search);

    load_notes(&mut coordinator).await
}
