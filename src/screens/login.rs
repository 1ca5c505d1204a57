//! Login screen — email and password prompt against the auth provider.

use std::io::Write;

use colored::Colorize;
use tokio::io::AsyncBufRead;
use tracing::warn;

use super::{Input, ScreenError};
use crate::services::auth::{AuthError, AuthSession, IdentityHandle, LoginForm, SessionFile};

const MAX_ATTEMPTS: usize = 3;

/// Anything that can exchange credentials for a session.
#[async_trait::async_trait]
pub trait SignIn: Send + Sync {
    async fn sign_in(&self, form: &LoginForm) -> Result<AuthSession, AuthError>;
}

#[async_trait::async_trait]
impl SignIn for crate::services::auth::AuthClient {
    async fn sign_in(&self, form: &LoginForm) -> Result<AuthSession, AuthError> {
        crate::services::auth::AuthClient::sign_in(self, form).await
    }
}

/// Title and message shown for a failed attempt.
#[must_use]
pub fn failure_toast(err: &AuthError) -> (&'static str, String) {
    match err {
        AuthError::PasswordTooShort => ("Invalid Password", err.to_string()),
        AuthError::InvalidEmail => ("Invalid Email", err.to_string()),
        AuthError::VerificationRequired => ("Authentication Error", err.to_string()),
        _ => ("Authentication Failed", err.to_string()),
    }
}

/// Prompt for credentials until sign-in succeeds or attempts run out.
///
/// On success the session is saved and the identity resolved.
///
/// # Errors
///
/// Returns the last sign-in error after the final attempt, or an IO error.
pub async fn run<R, W>(
    input: &mut Input<R>,
    out: &mut W,
    client: &dyn SignIn,
    email: Option<String>,
    sessions: &SessionFile,
    identity: &IdentityHandle,
) -> Result<AuthSession, ScreenError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "Welcome back")?;
    writeln!(out, "Please enter your email & password to log in.")?;

    let mut email = email;
    let mut last_error = None;
    for _ in 0..MAX_ATTEMPTS {
        let address = match email.take() {
            Some(address) => address,
            None => input.require(out, "Email: ").await?,
        };
        let password = input.require(out, "Password (min 8 characters): ").await?;
        let form = LoginForm::new(&address, &password);

        let result = match form.validate() {
            Ok(()) => client.sign_in(&form).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(session) => {
                sessions.save(&session)?;
                identity.resolve(&session.user_id);
                writeln!(out, "{}", "Signed in.".green())?;
                return Ok(session);
            }
            Err(e) => {
                warn!(error = %e, "login: attempt failed");
                let (title, message) = failure_toast(&e);
                writeln!(out, "{}", format!("{title}: {message}").red())?;
                // Keep the address for retries after a bad password.
                email = Some(form.email);
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or(AuthError::VerificationRequired).into())
}

#[cfg(test)]
#[path = "login_test.rs"]
mod tests;
