//! Authentication provider seam and the hosted email/password auth client.

use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::FirebaseConfig;
use crate::util::unix_timestamp_now;

const EXPIRY_SKEW_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Auth is not configured for this profile.")]
    NotConfigured,
    #[error("Not signed in")]
    NotSignedIn,
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("{0}")]
    InvalidCredentials(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Authentication failed: {0}")]
    Api(String),
    #[error("Session storage error: {0}")]
    SessionStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// What the note list needs from authentication: who is signed in, and a way
/// to sign them out.
pub trait AuthProvider: Send + Sync {
    /// Id of the signed-in user, `None` when nobody is signed in
    fn current_user_id(&self) -> Option<String>;

    /// End the current session
    fn sign_out(&self) -> AuthResult<()>;
}

pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Session persistence that lives only as long as the process.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    session: Arc<Mutex<Option<AuthSession>>>,
}

impl SessionPersistence for MemorySessionStore {
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let guard = self
            .session
            .lock()
            .map_err(|error| AuthError::SessionStorage(error.to_string()))?;
        Ok(guard.clone())
    }

    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let mut guard = self
            .session
            .lock()
            .map_err(|error| AuthError::SessionStorage(error.to_string()))?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> AuthResult<()> {
        let mut guard = self
            .session
            .lock()
            .map_err(|error| AuthError::SessionStorage(error.to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// Auth provider with a fixed user, for offline wiring and tests.
#[derive(Debug, Default)]
pub struct StaticAuthProvider {
    user_id: RwLock<Option<String>>,
}

impl StaticAuthProvider {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: RwLock::new(Some(user_id.into())),
        }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }
}

impl AuthProvider for StaticAuthProvider {
    fn current_user_id(&self) -> Option<String> {
        self.user_id.read().ok().and_then(|guard| guard.clone())
    }

    fn sign_out(&self) -> AuthResult<()> {
        let mut guard = self
            .user_id
            .write()
            .map_err(|error| AuthError::SessionStorage(error.to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// Email/password client for the Identity Toolkit and Secure Token REST APIs.
#[derive(Clone)]
pub struct FirebaseAuthClient<S: SessionPersistence> {
    api_key: String,
    identity_url: String,
    secure_token_url: String,
    client: Client,
    store: S,
    current: Arc<RwLock<Option<AuthSession>>>,
}

impl<S: SessionPersistence> FirebaseAuthClient<S> {
    pub fn new(config: &FirebaseConfig, store: S) -> AuthResult<Self> {
        let api_key = config.api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(AuthError::InvalidConfiguration("API key must not be empty"));
        }

        Ok(Self {
            api_key,
            identity_url: config.identity_url.clone(),
            secure_token_url: config.secure_token_url.clone(),
            client: Client::builder().build()?,
            store,
            current: Arc::new(RwLock::new(None)),
        })
    }

    /// Load the persisted session, refreshing it when it has expired.
    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored_session) = self.store.load_session()? else {
            return Ok(None);
        };

        if !stored_session.is_expired() {
            self.set_current(Some(stored_session.clone()));
            return Ok(Some(stored_session));
        }

        match self.refresh_session(&stored_session).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {}", error);
                self.store.clear_session()?;
                self.set_current(None);
                Ok(None)
            }
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let (email, password) = validate_credentials(email, password)?;
        let payload = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let request = self
            .client
            .post(format!("{}/accounts:signUp", self.identity_url))
            .query(&[("key", &self.api_key)])
            .json(&payload);

        let response: PasswordAuthResponse = self.send_auth_request(request).await?;
        let session = response.into_session()?;
        self.persist(&session)?;
        tracing::info!("Registered new account {}", session.user.id);
        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let (email, password) = validate_credentials(email, password)?;
        let payload = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let request = self
            .client
            .post(format!("{}/accounts:signInWithPassword", self.identity_url))
            .query(&[("key", &self.api_key)])
            .json(&payload);

        let response: PasswordAuthResponse = self.send_auth_request(request).await?;
        let session = response.into_session()?;
        self.persist(&session)?;
        tracing::info!("Signed in as {}", session.user.id);
        Ok(session)
    }

    /// Exchange the session's refresh token for a fresh id token.
    pub async fn refresh_session(&self, session: &AuthSession) -> AuthResult<AuthSession> {
        if session.refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }

        let request = self
            .client
            .post(format!("{}/token", self.secure_token_url))
            .query(&[("key", &self.api_key)])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", session.refresh_token.as_str()),
            ]);
        let response: RefreshTokenResponse = self.send_auth_request(request).await?;
        let refreshed = response.into_session(session.user.email.clone())?;
        self.persist(&refreshed)?;
        tracing::debug!("Refreshed session for {}", refreshed.user.id);
        Ok(refreshed)
    }

    /// A usable id token, refreshing the session first when it has expired.
    pub async fn id_token(&self) -> AuthResult<String> {
        let session = self.current_session().ok_or(AuthError::NotSignedIn)?;
        if session.is_expired() {
            return Ok(self.refresh_session(&session).await?.id_token);
        }
        Ok(session.id_token)
    }

    #[must_use]
    pub fn current_session(&self) -> Option<AuthSession> {
        self.current.read().ok().and_then(|guard| guard.clone())
    }

    fn persist(&self, session: &AuthSession) -> AuthResult<()> {
        self.store.save_session(session)?;
        self.set_current(Some(session.clone()));
        Ok(())
    }

    fn set_current(&self, session: Option<AuthSession>) {
        if let Ok(mut guard) = self.current.write() {
            *guard = session;
        }
    }

    async fn send_auth_request<T: for<'de> Deserialize<'de>>(
        &self,
        request: RequestBuilder,
    ) -> AuthResult<T> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(response.json::<T>().await?)
    }
}

impl<S: SessionPersistence> AuthProvider for FirebaseAuthClient<S> {
    fn current_user_id(&self) -> Option<String> {
        self.current_session().map(|session| session.user.id)
    }

    fn sign_out(&self) -> AuthResult<()> {
        self.store.clear_session()?;
        self.set_current(None);
        tracing::info!("Signed out");
        Ok(())
    }
}

/// Trim credentials and reject empty values.
pub fn validate_credentials<'a>(
    email: &'a str,
    password: &'a str,
) -> AuthResult<(&'a str, &'a str)> {
    let email = email.trim();
    let password = password.trim();
    if email.is_empty() {
        return Err(AuthError::InvalidCredentials("Email is required"));
    }
    if password.is_empty() {
        return Err(AuthError::InvalidCredentials("Password is required"));
    }
    Ok((email, password))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordAuthResponse {
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
    local_id: Option<String>,
    email: Option<String>,
}

impl PasswordAuthResponse {
    fn into_session(self) -> AuthResult<AuthSession> {
        match (self.id_token, self.refresh_token, self.local_id) {
            (Some(id_token), Some(refresh_token), Some(local_id)) => Ok(AuthSession {
                id_token,
                refresh_token,
                expires_at: expires_at_from(self.expires_in.as_deref())?,
                user: AuthUser {
                    id: local_id,
                    email: self.email,
                },
            }),
            _ => Err(AuthError::Api(
                "Auth response did not include enough session fields".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefreshTokenResponse {
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
    user_id: Option<String>,
}

impl RefreshTokenResponse {
    fn into_session(self, email: Option<String>) -> AuthResult<AuthSession> {
        match (self.id_token, self.refresh_token, self.user_id) {
            (Some(id_token), Some(refresh_token), Some(user_id)) => Ok(AuthSession {
                id_token,
                refresh_token,
                expires_at: expires_at_from(self.expires_in.as_deref())?,
                user: AuthUser { id: user_id, email },
            }),
            _ => Err(AuthError::Api(
                "Refresh response did not include enough session fields".to_string(),
            )),
        }
    }
}

fn expires_at_from(expires_in: Option<&str>) -> AuthResult<i64> {
    let seconds = expires_in
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .ok_or_else(|| AuthError::Api("Auth response had no usable expiresIn".to_string()))?;
    Ok(unix_timestamp_now().saturating_add(seconds))
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorEnvelope {
        error: Some(ErrorBody {
            message: Some(message),
        }),
    }) = serde_json::from_str::<ErrorEnvelope>(body)
    {
        return format!("{} ({})", describe_error_code(message.trim()), status.as_u16());
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", crate::util::compact_text(trimmed), status.as_u16())
    }
}

fn describe_error_code(code: &str) -> String {
    let known = match code.split(':').next().unwrap_or(code).trim() {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            Some("Invalid email or password")
        }
        "EMAIL_EXISTS" => Some("An account already exists for this email"),
        "USER_DISABLED" => Some("This account has been disabled"),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => Some("Too many attempts, try again later"),
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" => Some("Session expired, sign in again"),
        _ => None,
    };
    known.map_or_else(|| code.to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_one_shot_server;

    fn config_for(base: &str) -> FirebaseConfig {
        FirebaseConfig::new("test-key", "demo")
            .unwrap()
            .with_auth_emulator(base)
            .unwrap()
    }

    fn session(expires_at: i64) -> AuthSession {
        AuthSession {
            id_token: "secret-id-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at,
            user: AuthUser {
                id: "user-1".to_string(),
                email: Some("a@example.com".to_string()),
            },
        }
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let rendered = format!("{:?}", session(1_700_000_000));
        assert!(!rendered.contains("secret-id-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn expiry_uses_skew() {
        assert!(session(unix_timestamp_now() + 30).is_expired());
        assert!(!session(unix_timestamp_now() + 3600).is_expired());
    }

    #[test]
    fn validate_credentials_trims_and_requires_both() {
        assert_eq!(
            validate_credentials(" a@b.c ", " pw ").unwrap(),
            ("a@b.c", "pw")
        );
        assert_eq!(
            validate_credentials("  ", "pw").unwrap_err().to_string(),
            "Email is required"
        );
        assert_eq!(
            validate_credentials("a@b.c", "").unwrap_err().to_string(),
            "Password is required"
        );
    }

    #[test]
    fn parse_api_error_maps_known_codes() {
        let body = r#"{"error":{"code":400,"message":"INVALID_LOGIN_CREDENTIALS"}}"#;
        assert_eq!(
            parse_api_error(StatusCode::BAD_REQUEST, body),
            "Invalid email or password (400)"
        );
        let body = r#"{"error":{"code":400,"message":"WEAK_PASSWORD : Password should be at least 6 characters"}}"#;
        assert!(parse_api_error(StatusCode::BAD_REQUEST, body).starts_with("WEAK_PASSWORD"));
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
    }

    #[test]
    fn static_provider_signs_out() {
        let provider = StaticAuthProvider::signed_in("user-1");
        assert_eq!(provider.current_user_id().as_deref(), Some("user-1"));
        provider.sign_out().unwrap();
        assert_eq!(provider.current_user_id(), None);
        assert_eq!(StaticAuthProvider::signed_out().current_user_id(), None);
    }

    #[tokio::test]
    async fn sign_in_persists_session_and_exposes_user() {
        let body = r#"{"idToken":"id-1","refreshToken":"refresh-1","expiresIn":"3600","localId":"uid-42","email":"a@example.com","registered":true}"#;
        let (base, requests) = spawn_one_shot_server("200 OK", body).await;
        let store = MemorySessionStore::default();
        let client = FirebaseAuthClient::new(&config_for(&base), store.clone()).unwrap();

        let session = client.sign_in(" a@example.com ", "hunter2").await.unwrap();
        assert_eq!(session.user.id, "uid-42");
        assert_eq!(client.current_user_id().as_deref(), Some("uid-42"));
        assert_eq!(store.load_session().unwrap(), Some(session));

        let captured = requests.await.unwrap();
        assert!(captured[0].request_line.contains("accounts:signInWithPassword"));
        assert!(captured[0].request_line.contains("key=test-key"));
        assert!(captured[0].body.contains(r#""email":"a@example.com""#));
    }

    #[tokio::test]
    async fn sign_in_failure_reports_api_message() {
        let body = r#"{"error":{"code":400,"message":"EMAIL_NOT_FOUND"}}"#;
        let (base, _requests) = spawn_one_shot_server("400 Bad Request", body).await;
        let client =
            FirebaseAuthClient::new(&config_for(&base), MemorySessionStore::default()).unwrap();

        let error = client.sign_in("a@example.com", "pw").await.unwrap_err();
        assert_eq!(
            error.to_string(),
            "Authentication failed: Invalid email or password (400)"
        );
        assert_eq!(client.current_user_id(), None);
    }

    #[tokio::test]
    async fn restore_refreshes_expired_session() {
        let body = r#"{"id_token":"id-2","refresh_token":"refresh-2","expires_in":"3600","user_id":"user-1","token_type":"Bearer"}"#;
        let (base, requests) = spawn_one_shot_server("200 OK", body).await;
        let store = MemorySessionStore::default();
        store.save_session(&session(0)).unwrap();
        let client = FirebaseAuthClient::new(&config_for(&base), store.clone()).unwrap();

        let restored = client.restore_session().await.unwrap().unwrap();
        assert_eq!(restored.id_token, "id-2");
        assert_eq!(restored.user.email.as_deref(), Some("a@example.com"));
        assert_eq!(client.id_token().await.unwrap(), "id-2");

        let captured = requests.await.unwrap();
        assert!(captured[0].request_line.starts_with("POST /securetoken.googleapis.com/v1/token"));
        assert!(captured[0].body.contains("grant_type=refresh_token"));
    }

    #[tokio::test]
    async fn restore_clears_session_when_refresh_fails() {
        let body = r#"{"error":{"code":400,"message":"TOKEN_EXPIRED"}}"#;
        let (base, _requests) = spawn_one_shot_server("400 Bad Request", body).await;
        let store = MemorySessionStore::default();
        store.save_session(&session(0)).unwrap();
        let client = FirebaseAuthClient::new(&config_for(&base), store.clone()).unwrap();

        assert!(client.restore_session().await.unwrap().is_none());
        assert!(store.load_session().unwrap().is_none());
    }

    #[tokio::test]
    async fn sign_out_clears_persisted_session() {
        let store = MemorySessionStore::default();
        store.save_session(&session(i64::MAX / 2)).unwrap();
        let client = FirebaseAuthClient::new(
            &FirebaseConfig::new("key", "demo").unwrap(),
            store.clone(),
        )
        .unwrap();

        client.restore_session().await.unwrap();
        assert_eq!(client.current_user_id().as_deref(), Some("user-1"));

        client.sign_out().unwrap();
        assert_eq!(client.current_user_id(), None);
        assert!(store.load_session().unwrap().is_none());
    }
}
