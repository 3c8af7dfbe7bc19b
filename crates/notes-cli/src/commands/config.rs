use std::env;

use notes_core::config::{ENV_API_KEY, ENV_FIRESTORE_URL, ENV_POLL_INTERVAL_MS, ENV_PROJECT_ID};
use notes_core::util::{is_http_url, normalize_text_option};

use crate::cli::ConfigCommands;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

/// Profile values supplied on the command line
#[derive(Debug, Default, Clone)]
pub struct ProfileInit {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub firestore_url: Option<String>,
    pub auth_emulator_url: Option<String>,
    pub poll_interval_ms: Option<u64>,
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            api_key,
            project_id,
            firestore_url,
            auth_emulator_url,
            poll_interval_ms,
            no_activate,
        } => run_config_init(
            global_profile,
            ProfileInit {
                api_key,
                project_id,
                firestore_url,
                auth_emulator_url,
                poll_interval_ms,
            },
            no_activate,
        ),
        ConfigCommands::Show => run_config_show(global_profile),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    init: ProfileInit,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);

    let profile = config.profile_mut_or_default(&profile_name);
    apply_profile_init(profile, init, |key| env::var(key).ok())?;

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let profile = config
        .profiles
        .get(&profile_name)
        .ok_or_else(|| CliError::Config("Failed to persist profile".to_string()))?;
    let missing_fields = missing_profile_fields(profile);
    if missing_fields.is_empty() {
        println!(
            "Profile '{profile_name}' is ready. Run `notes auth login --email <email> --password <password>`."
        );
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing_fields.join(", ")
        );
    }

    Ok(())
}

/// Merge explicit values, then the environment, over what the profile already holds.
pub fn apply_profile_init(
    profile: &mut CliProfile,
    init: ProfileInit,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), CliError> {
    let from_env = |key: &str| normalize_text_option(lookup(key));

    if let Some(value) = normalize_text_option(init.api_key).or_else(|| from_env(ENV_API_KEY)) {
        profile.firebase_api_key = Some(value);
    }
    if let Some(value) =
        normalize_text_option(init.project_id).or_else(|| from_env(ENV_PROJECT_ID))
    {
        profile.firebase_project_id = Some(value);
    }
    if let Some(value) =
        normalize_text_option(init.firestore_url).or_else(|| from_env(ENV_FIRESTORE_URL))
    {
        profile.firestore_url = Some(normalize_url("firestore_url", &value)?);
    }
    if let Some(value) = normalize_text_option(init.auth_emulator_url) {
        profile.auth_emulator_url = Some(normalize_url("auth_emulator_url", &value)?);
    }

    let poll_interval_ms = match init.poll_interval_ms {
        Some(millis) => Some(millis),
        None => from_env(ENV_POLL_INTERVAL_MS)
            .map(|raw| {
                raw.parse::<u64>().map_err(|_| {
                    CliError::Config(format!("{ENV_POLL_INTERVAL_MS} must be a whole number"))
                })
            })
            .transpose()?,
    };
    if let Some(millis) = poll_interval_ms {
        if millis == 0 {
            return Err(CliError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        profile.poll_interval_ms = Some(millis);
    }

    Ok(())
}

pub fn normalize_url(field: &str, url: &str) -> Result<String, CliError> {
    if !is_http_url(url) {
        return Err(CliError::Config(format!(
            "{field} must include http:// or https://"
        )));
    }
    Ok(url.trim_end_matches('/').to_string())
}

pub fn missing_profile_fields(profile: &CliProfile) -> Vec<&'static str> {
    let mut missing_fields = Vec::new();
    if profile.firebase_api_key.is_none() {
        missing_fields.push("api_key");
    }
    if profile.firebase_project_id.is_none() {
        missing_fields.push("project_id");
    }
    missing_fields
}

fn run_config_show(global_profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let Some(profile) = config.profile(&profile_name) else {
        println!("Profile '{profile_name}' is not configured.");
        return Ok(());
    };

    let mut shown = profile.clone();
    shown.firebase_api_key = shown.firebase_api_key.as_deref().map(mask_secret);

    let active = config.active_profile.as_deref() == Some(profile_name.as_str());
    println!(
        "Profile '{}'{}",
        profile_name,
        if active { " (active)" } else { "" }
    );
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}

/// Keep the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("****{visible}")
    }
}
