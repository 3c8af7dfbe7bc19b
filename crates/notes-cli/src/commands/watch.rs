use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;

use notes_core::auth::AuthProvider;
use notes_core::store::NoteStore;
use notes_core::{NoteListCoordinator, SortOrder};

use crate::commands::common::open_backend;
use crate::error::CliError;
use crate::presenter::{OutputFormat, TerminalPresenter};

pub async fn run_watch(
    global_profile: Option<&str>,
    sort: SortOrder,
    search: Option<&str>,
) -> Result<(), CliError> {
    let backend = open_backend(global_profile).await?;
    tracing::info!("Watching notes for profile '{}'", backend.profile_name);
    let interrupted = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", error);
            std::future::pending::<()>().await;
        }
    };

    watch_notes(
        backend.store,
        backend.auth.provider(),
        sort,
        search,
        &mut io::stdout(),
        interrupted,
    )
    .await
}

/// Render the list on every change until `stop` resolves or the listener ends.
pub async fn watch_notes<S, W, F>(
    store: Arc<S>,
    auth: &dyn AuthProvider,
    sort: SortOrder,
    search: Option<&str>,
    out: &mut W,
    stop: F,
) -> Result<(), CliError>
where
    S: NoteStore,
    W: Write,
    F: Future<Output = ()>,
{
    let presenter = TerminalPresenter::new(out, OutputFormat::Text).with_header();
    let mut coordinator = NoteListCoordinator::new(store, auth, presenter)?
        .with_sort_order(sort)
        .with_filter(search);

    coordinator.start().await;
    if !coordinator.is_listening() {
        return Err(CliError::Reported);
    }

    tokio::pin!(stop);
    loop {
        tokio::select! {
            () = &mut stop => break,
            event = coordinator.next_event() => {
                let Some(event) = event else {
                    break;
                };
                coordinator.handle_event(event);
            }
        }
    }

    coordinator.shutdown();
    let presenter = coordinator.presenter();
    tracing::debug!(
        "Stopped watching after {} render(s) and {} failure notice(s)",
        presenter.render_count(),
        presenter.failure_count()
    );
    Ok(())
}
