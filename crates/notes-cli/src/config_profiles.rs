//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use notes_core::config::{
    FirebaseConfig, ENV_API_KEY, ENV_FIRESTORE_URL, ENV_POLL_INTERVAL_MS, ENV_PROJECT_ID,
};
use notes_core::util::normalize_text_option;
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "cli-config.json";
const ENV_CONFIG_DIR: &str = "NOTES_CONFIG_DIR";
const ENV_PROFILE: &str = "NOTES_PROFILE";
const ENV_AUTH_EMULATOR_URL: &str = "NOTES_AUTH_EMULATOR_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub firebase_api_key: Option<String>,
    #[serde(default)]
    pub firebase_project_id: Option<String>,
    #[serde(default)]
    pub firestore_url: Option<String>,
    #[serde(default)]
    pub auth_emulator_url: Option<String>,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
}

const fn default_config_version() -> u32 {
    1
}

/// Directory holding the CLI config file and stored sessions.
pub fn config_dir() -> Result<PathBuf, String> {
    if let Some(dir) = normalize_text_option(std::env::var(ENV_CONFIG_DIR).ok()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|dir| dir.join("notes"))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

pub fn default_config_path() -> Result<PathBuf, String> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        if let Some(profile) = normalize_profile_name(explicit) {
            return profile;
        }
        if let Some(profile) = normalize_profile_name(std::env::var(ENV_PROFILE).ok().as_deref())
        {
            return profile;
        }
        if let Some(profile) = normalize_profile_name(self.active_profile.as_deref()) {
            return profile;
        }
        "default".to_string()
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    /// Backend config from this profile, falling back to the environment for
    /// anything the profile leaves unset.
    pub fn firebase_config(&self) -> notes_core::Result<Option<FirebaseConfig>> {
        self.firebase_config_with(|key| std::env::var(key).ok())
    }

    fn firebase_config_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> notes_core::Result<Option<FirebaseConfig>> {
        let poll_interval_ms = self.poll_interval_ms.map(|millis| millis.to_string());
        let profile_value = |key: &str| match key {
            ENV_API_KEY => self.firebase_api_key.clone(),
            ENV_PROJECT_ID => self.firebase_project_id.clone(),
            ENV_FIRESTORE_URL => self.firestore_url.clone(),
            ENV_POLL_INTERVAL_MS => poll_interval_ms.clone(),
            _ => None,
        };
        let Some(mut config) =
            FirebaseConfig::from_lookup(|key| profile_value(key).or_else(|| lookup(key)))?
        else {
            return Ok(None);
        };

        if let Some(url) = normalize_text_option(
            self.auth_emulator_url
                .clone()
                .or_else(|| lookup(ENV_AUTH_EMULATOR_URL)),
        ) {
            config = config.with_auth_emulator(&url)?;
        }
        Ok(Some(config))
    }

    fn normalize(&mut self) {
        self.firebase_api_key = normalize_text_option(self.firebase_api_key.clone());
        self.firebase_project_id = normalize_text_option(self.firebase_project_id.clone());
        self.firestore_url = normalize_text_option(self.firestore_url.clone());
        self.auth_emulator_url = normalize_text_option(self.auth_emulator_url.clone());
    }
}
