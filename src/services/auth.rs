//! Auth service — password sign-in, persisted session, identity handle.
//!
//! Sign-in goes to a hosted identity provider over HTTP. The resulting
//! session is kept in a small JSON file so later CLI invocations reuse it,
//! and the signed-in user id is published through an [`IdentityHandle`]
//! that chat screens wait on.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{info, warn};

const SIGN_IN_PATH: &str = "/v1/client/sign_ins";
const DEFAULT_SESSION_FILE: &str = ".chatbuddy-session.json";
const MIN_PASSWORD_LEN: usize = 8;
const AUTH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Password must be at least 8 characters")]
    PasswordTooShort,
    #[error("Enter a valid email address")]
    InvalidEmail,
    #[error("Additional verification required")]
    VerificationRequired,
    #[error("{0}")]
    Rejected(String),
    #[error("auth request failed: {0}")]
    Request(String),
    #[error("unexpected auth response: {0}")]
    Response(String),
    #[error("session file error: {0}")]
    SessionIo(#[from] std::io::Error),
    #[error("session file is not valid JSON: {0}")]
    SessionParse(#[from] serde_json::Error),
}

// =============================================================================
// LOGIN FORM
// =============================================================================

/// Credentials entered on the login screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    #[must_use]
    pub fn new(email: &str, password: &str) -> Self {
        Self { email: email.trim().to_owned(), password: password.to_owned() }
    }

    /// Whether the submit action is enabled.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.email_looks_valid() && self.password.chars().count() >= MIN_PASSWORD_LEN
    }

    /// # Errors
    ///
    /// Returns the first problem that would block submission.
    pub fn validate(&self) -> Result<(), AuthError> {
        if !self.email_looks_valid() {
            return Err(AuthError::InvalidEmail);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::PasswordTooShort);
        }
        Ok(())
    }

    fn email_looks_valid(&self) -> bool {
        self.email.contains('@') && self.email.contains('.')
    }
}

// =============================================================================
// PROVIDER CLIENT
// =============================================================================

/// Identity provider configuration loaded from environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub base_url: String,
}

impl AuthConfig {
    /// Load from `AUTH_BASE_URL`. Returns `None` if unset (sign-in disabled).
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("AUTH_BASE_URL").ok()?;
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return None;
        }
        Some(Self { base_url: base_url.to_owned() })
    }

    #[must_use]
    pub fn sign_in_url(&self) -> String {
        format!("{}{SIGN_IN_PATH}", self.base_url)
    }
}

/// An established provider session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub session_id: String,
    pub user_id: String,
}

pub struct AuthClient {
    http: reqwest::Client,
    config: AuthConfig,
}

impl AuthClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: AuthConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(AUTH_TIMEOUT_SECS))
            .build()
            .map_err(|e| AuthError::Request(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Exchange email and password for a session.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request is made, a rejection
    /// carrying the provider's message, or [`AuthError::VerificationRequired`]
    /// when the attempt needs another factor.
    pub async fn sign_in(&self, form: &LoginForm) -> Result<AuthSession, AuthError> {
        form.validate()?;
        let resp = self
            .http
            .post(self.config.sign_in_url())
            .form(&[("identifier", form.email.as_str()), ("password", form.password.as_str()), ("strategy", "password")])
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "auth: sign-in rejected");
            return Err(parse_error_response(&body, status.as_u16()));
        }
        let session = parse_sign_in_response(&body)?;
        info!(user_id = %session.user_id, "auth: signed in");
        Ok(session)
    }
}

/// Extract the session from a successful sign-in response.
pub(crate) fn parse_sign_in_response(body: &str) -> Result<AuthSession, AuthError> {
    let root: Value = serde_json::from_str(body).map_err(|_| AuthError::Response(body.to_owned()))?;
    let attempt = root.get("response").unwrap_or(&root);

    let status = attempt.get("status").and_then(Value::as_str).unwrap_or_default();
    if status != "complete" {
        warn!(status, "auth: sign-in incomplete");
        return Err(AuthError::VerificationRequired);
    }

    let session_id = attempt
        .get("created_session_id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::Response("missing created_session_id".into()))?;

    let user_id = root
        .pointer("/client/sessions")
        .and_then(Value::as_array)
        .and_then(|sessions| {
            sessions
                .iter()
                .find(|s| s.get("id").and_then(Value::as_str) == Some(session_id))
        })
        .and_then(|s| s.pointer("/user/id"))
        .or_else(|| attempt.get("user_id"))
        .and_then(Value::as_str)
        .ok_or_else(|| AuthError::Response("missing user id".into()))?;

    Ok(AuthSession { session_id: session_id.to_owned(), user_id: user_id.to_owned() })
}

/// Turn a provider error body into the message shown to the user.
pub(crate) fn parse_error_response(body: &str, status: u16) -> AuthError {
    let message = serde_json::from_str::<Value>(body).ok().and_then(|root| {
        let first = root.get("errors")?.get(0)?;
        first
            .get("long_message")
            .or_else(|| first.get("message"))
            .and_then(Value::as_str)
            .map(str::to_owned)
    });
    AuthError::Rejected(message.unwrap_or_else(|| format!("sign-in failed with status {status}")))
}

// =============================================================================
// SESSION FILE
// =============================================================================

/// Where the signed-in session is remembered between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path from `CHATBUDDY_SESSION_FILE`, or `.chatbuddy-session.json`.
    #[must_use]
    pub fn from_env() -> Self {
        let path = std::env::var("CHATBUDDY_SESSION_FILE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_FILE.to_owned());
        Self::new(path)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved session. A missing file means signed out.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<AuthSession>, AuthError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, session: &AuthSession) -> Result<(), AuthError> {
        let text = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }

    /// Forget the saved session. Clearing an absent file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

/// The signed-in user id, observable by screens.
///
/// `None` means identity is not resolved yet (or signed out). Screens that
/// need an identity wait on [`IdentityHandle::wait`] instead of failing.
#[derive(Debug, Clone)]
pub struct IdentityHandle {
    tx: watch::Sender<Option<String>>,
}

impl Default for IdentityHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityHandle {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    #[must_use]
    pub fn resolved(user_id: &str) -> Self {
        let handle = Self::new();
        handle.resolve(user_id);
        handle
    }

    pub fn resolve(&self, user_id: &str) {
        self.tx.send_replace(Some(user_id.to_owned()));
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }

    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    /// Wait until an identity is available.
    pub async fn wait(&self) -> String {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(id) = rx.borrow_and_update().clone() {
                return id;
            }
            // The sender lives in `self`, so the channel cannot close here.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
