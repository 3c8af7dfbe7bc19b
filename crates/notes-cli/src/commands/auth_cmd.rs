use crate::auth::{clear_stored_session, load_stored_session, AuthSession, NotesAuthService};
use crate::cli::AuthCommands;
use crate::commands::common::resolve_firebase_config;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);

    match command {
        AuthCommands::Login { email, password } => {
            let firebase = resolve_firebase_config(&config, &profile_name)?;
            let auth_service = NotesAuthService::new_for_profile(&profile_name, &firebase)?;
            let session = auth_service.sign_in(&email, &password).await?;
            println!(
                "Signed in profile '{profile_name}' as {}",
                email_label(&session)
            );
            Ok(())
        }
        AuthCommands::Register { email, password } => {
            let firebase = resolve_firebase_config(&config, &profile_name)?;
            let auth_service = NotesAuthService::new_for_profile(&profile_name, &firebase)?;
            let session = auth_service.sign_up(&email, &password).await?;
            println!(
                "Registered and signed in profile '{profile_name}' as {}",
                email_label(&session)
            );
            Ok(())
        }
        AuthCommands::Status => {
            let session = match resolve_firebase_config(&config, &profile_name) {
                Ok(firebase) => {
                    NotesAuthService::new_for_profile(&profile_name, &firebase)?
                        .restore_session()
                        .await?
                }
                Err(CliError::NotConfigured(_)) => load_stored_session(&profile_name)?,
                Err(error) => return Err(error),
            };

            if let Some(session) = session {
                println!(
                    "Profile '{}' is signed in as {} (user_id={}, expires_at={})",
                    profile_name,
                    email_label(&session),
                    session.user.id,
                    session.expires_at
                );
            } else {
                println!("Profile '{profile_name}' is not signed in.");
            }
            Ok(())
        }
        AuthCommands::Logout => {
            match resolve_firebase_config(&config, &profile_name) {
                Ok(firebase) => {
                    NotesAuthService::new_for_profile(&profile_name, &firebase)?.sign_out()?;
                }
                Err(CliError::NotConfigured(_)) => clear_stored_session(&profile_name)?,
                Err(error) => return Err(error),
            }
            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
    }
}

fn email_label(session: &AuthSession) -> &str {
    session.user.email.as_deref().unwrap_or("(no email)")
}
