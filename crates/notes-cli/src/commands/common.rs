use std::env;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use notes_core::config::FirebaseConfig;
use notes_core::store::{FirestoreNoteStore, NoteStore};
use notes_core::{Note, NoteId, NoteListCoordinator, WriteReport};

use crate::auth::NotesAuthService;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;
use crate::presenter::TerminalPresenter;

pub type TerminalCoordinator<'a, S, W> = NoteListCoordinator<S, TerminalPresenter<'a, W>>;

/// A signed-in profile's auth service and note store.
pub struct Backend {
    pub profile_name: String,
    pub auth: NotesAuthService,
    pub store: Arc<FirestoreNoteStore>,
}

pub async fn open_backend(global_profile: Option<&str>) -> Result<Backend, CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let firebase = resolve_firebase_config(&config, &profile_name)?;

    let auth = NotesAuthService::new_for_profile(&profile_name, &firebase)?;
    if auth.restore_session().await?.is_none() {
        return Err(CliError::NotSignedIn(profile_name));
    }
    let token = auth.id_token().await?;
    let store = FirestoreNoteStore::new(firebase)?.with_id_token(token);

    tracing::debug!("Opened backend for profile '{}'", profile_name);
    Ok(Backend {
        profile_name,
        auth,
        store: Arc::new(store),
    })
}

pub fn resolve_firebase_config(
    config: &CliProfilesConfig,
    profile_name: &str,
) -> Result<FirebaseConfig, CliError> {
    let profile = config.profile(profile_name).cloned().unwrap_or_default();
    profile
        .firebase_config()?
        .ok_or_else(|| CliError::NotConfigured(profile_name.to_string()))
}

/// Load the owner's notes once; fails when the store could not be queried.
pub async fn load_notes<S: NoteStore, W: Write>(
    coordinator: &mut TerminalCoordinator<'_, S, W>,
) -> Result<(), CliError> {
    if coordinator.refresh().await {
        Ok(())
    } else {
        Err(CliError::Reported)
    }
}

/// Wait for the single submitted write and turn a failure into an error.
pub async fn settle_single<S: NoteStore, W: Write>(
    coordinator: &mut TerminalCoordinator<'_, S, W>,
) -> Result<WriteReport, CliError> {
    let report = coordinator
        .settle()
        .await
        .into_iter()
        .next()
        .ok_or(CliError::Reported)?;
    if report.succeeded() {
        Ok(report)
    } else {
        Err(CliError::Reported)
    }
}

/// Resolve an exact id or a unique id prefix against cached notes.
pub fn resolve_note_id(notes: &[Note], note_query: &str) -> Result<NoteId, CliError> {
    let note_query = normalize_note_identifier(note_query)?;
    if let Some(note) = notes.iter().find(|note| note.id.as_str() == note_query) {
        return Ok(note.id.clone());
    }

    let mut matching_ids: Vec<&NoteId> = notes
        .iter()
        .map(|note| &note.id)
        .filter(|id| id.as_str().starts_with(&note_query))
        .collect();
    matching_ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    match matching_ids.as_slice() {
        [] => Err(CliError::NoteNotFound(note_query)),
        [id] => Ok((*id).clone()),
        _ => {
            let options = matching_ids
                .iter()
                .take(3)
                .map(|id| id.as_str().chars().take(13).collect::<String>())
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousNoteId(format!(
                "ID prefix '{note_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Title and content for a new note: flags first, then piped stdin, then `$EDITOR`.
pub fn resolve_new_note_input(
    title: Option<String>,
    content: Option<String>,
) -> Result<(String, String), CliError> {
    if title.is_some() || content.is_some() {
        return Ok((title.unwrap_or_default(), content.unwrap_or_default()));
    }

    if let Some(text) = read_piped_stdin()? {
        return Ok(split_editor_text(&text));
    }

    match capture_editor_input_with_initial("")? {
        Some(text) => Ok(split_editor_text(&text)),
        None => Err(CliError::EmptyNote),
    }
}

/// Editor text layout: the first line is the title, the rest is the content.
pub fn split_editor_text(text: &str) -> (String, String) {
    let text = text.trim_start_matches(['\r', '\n']);
    match text.split_once('\n') {
        Some((title, content)) => (title.trim().to_string(), content.trim().to_string()),
        None => (text.trim().to_string(), String::new()),
    }
}

pub fn join_editor_text(title: &str, content: &str) -> String {
    format!("{title}\n\n{content}\n")
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_note_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let note_content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&note_content))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let mut command = Command::new(program);
            command.args(parts).arg(file_path);

            let status = command.status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

pub fn create_temp_note_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("notes-edit-{}-{now}.txt", std::process::id()))
}
