//! Backend configuration for client apps.
//!
//! A [`FirebaseConfig`] names the hosted project (public API key and project
//! id) plus the REST endpoints used for auth and the note collection. The
//! endpoints default to Google's hosted services and can be pointed at an
//! emulator.

use std::time::Duration;

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

pub const ENV_API_KEY: &str = "NOTES_FIREBASE_API_KEY";
pub const ENV_PROJECT_ID: &str = "NOTES_FIREBASE_PROJECT_ID";
pub const ENV_FIRESTORE_URL: &str = "NOTES_FIRESTORE_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "NOTES_POLL_INTERVAL_MS";

pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_COLLECTION: &str = "notes";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Hosted backend configuration.
///
/// The API key is a public client identifier, not a secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
    pub identity_url: String,
    pub secure_token_url: String,
    pub firestore_url: String,
    pub collection: String,
    pub poll_interval: Duration,
}

impl FirebaseConfig {
    /// Create a configuration with default endpoints.
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Result<Self> {
        let api_key = normalize_text_option(Some(api_key.into()))
            .ok_or_else(|| Error::InvalidInput("Firebase API key must not be empty".to_string()))?;
        let project_id = normalize_text_option(Some(project_id.into())).ok_or_else(|| {
            Error::InvalidInput("Firebase project id must not be empty".to_string())
        })?;

        Ok(Self {
            api_key,
            project_id,
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            secure_token_url: DEFAULT_SECURE_TOKEN_URL.to_string(),
            firestore_url: DEFAULT_FIRESTORE_URL.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Build from optional values.
    ///
    /// Returns `Ok(None)` when both are absent and an error when only one is set.
    pub fn resolve(api_key: Option<String>, project_id: Option<String>) -> Result<Option<Self>> {
        match (normalize_text_option(api_key), normalize_text_option(project_id)) {
            (None, None) => Ok(None),
            (Some(api_key), Some(project_id)) => Self::new(api_key, project_id).map(Some),
            (Some(_), None) => Err(Error::InvalidInput(format!(
                "Firebase configuration is incomplete. Missing: {ENV_PROJECT_ID}"
            ))),
            (None, Some(_)) => Err(Error::InvalidInput(format!(
                "Firebase configuration is incomplete. Missing: {ENV_API_KEY}"
            ))),
        }
    }

    /// Load configuration from `NOTES_*` keys resolved through `lookup`.
    ///
    /// Returns `Ok(None)` when neither the API key nor the project id is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let Some(config) = Self::resolve(lookup(ENV_API_KEY), lookup(ENV_PROJECT_ID))? else {
            return Ok(None);
        };

        let config = match normalize_text_option(lookup(ENV_FIRESTORE_URL)) {
            Some(url) => config.with_firestore_url(&url)?,
            None => config,
        };

        let config = match normalize_text_option(lookup(ENV_POLL_INTERVAL_MS)) {
            Some(raw) => {
                let millis = raw.parse::<u64>().map_err(|_| {
                    Error::InvalidInput(format!(
                        "{ENV_POLL_INTERVAL_MS} must be a whole number of milliseconds"
                    ))
                })?;
                config.with_poll_interval(Duration::from_millis(millis))
            }
            None => config,
        };

        Ok(Some(config))
    }

    /// Point both auth endpoints at an auth emulator base URL.
    pub fn with_auth_emulator(self, base_url: &str) -> Result<Self> {
        let base = normalize_base_url(base_url, "auth emulator url")?;
        Ok(Self {
            identity_url: format!("{base}/identitytoolkit.googleapis.com/v1"),
            secure_token_url: format!("{base}/securetoken.googleapis.com/v1"),
            ..self
        })
    }

    pub fn with_firestore_url(mut self, url: &str) -> Result<Self> {
        self.firestore_url = normalize_base_url(url, ENV_FIRESTORE_URL)?;
        Ok(self)
    }

    /// Set the live-listener poll interval, clamped to a sane minimum
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    /// Base URL of the project's document tree
    #[must_use]
    pub fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.firestore_url, self.project_id
        )
    }
}

fn normalize_base_url(raw: &str, field: &str) -> Result<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(Error::InvalidInput(format!("{field} must not be empty")));
    }
    if !is_http_url(value) {
        return Err(Error::InvalidInput(format!(
            "{field} must include http:// or https://"
        )));
    }
    Ok(value.trim_end_matches('/').to_string())
}
