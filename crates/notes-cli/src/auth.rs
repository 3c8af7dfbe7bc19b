//! CLI auth/session helpers with per-profile session files.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use notes_core::auth::{AuthProvider, AuthResult, FirebaseAuthClient, SessionPersistence};
pub use notes_core::auth::{AuthError, AuthSession};
use notes_core::config::FirebaseConfig;

use crate::config_profiles::config_dir;

/// Stores a profile's session as JSON in the CLI config directory.
#[derive(Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn for_profile(profile_name: &str) -> AuthResult<Self> {
        let dir = config_dir().map_err(AuthError::SessionStorage)?;
        Ok(Self::at(dir.join("sessions").join(format!("{profile_name}.json"))))
    }

    pub const fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionPersistence for FileSessionStore {
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(AuthError::SessionStorage(format!(
                "Failed to read {}: {error}",
                self.path.display()
            ))),
        }
    }

    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|error| AuthError::SessionStorage(error.to_string()))?;
        }
        let raw = serde_json::to_string_pretty(session)?;
        write_private(&self.path, raw.as_bytes()).map_err(|error| {
            AuthError::SessionStorage(format!("Failed to write {}: {error}", self.path.display()))
        })
    }

    fn clear_session(&self) -> AuthResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(AuthError::SessionStorage(error.to_string())),
        }
    }
}

#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(bytes)
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)
}

/// Firebase auth bound to one CLI profile's session file.
#[derive(Clone)]
pub struct NotesAuthService {
    inner: FirebaseAuthClient<FileSessionStore>,
}

impl NotesAuthService {
    pub fn new_for_profile(profile_name: &str, config: &FirebaseConfig) -> AuthResult<Self> {
        Ok(Self {
            inner: FirebaseAuthClient::new(config, FileSessionStore::for_profile(profile_name)?)?,
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.inner.sign_in(email, password).await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.inner.sign_up(email, password).await
    }

    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        self.inner.restore_session().await
    }

    pub async fn id_token(&self) -> AuthResult<String> {
        self.inner.id_token().await
    }

    pub fn provider(&self) -> &dyn AuthProvider {
        &self.inner
    }

    pub fn sign_out(&self) -> AuthResult<()> {
        self.inner.sign_out()
    }
}

pub fn load_stored_session(profile_name: &str) -> AuthResult<Option<AuthSession>> {
    FileSessionStore::for_profile(profile_name)?.load_session()
}

pub fn clear_stored_session(profile_name: &str) -> AuthResult<()> {
    FileSessionStore::for_profile(profile_name)?.clear_session()
}
