use super::*;
use std::sync::Mutex;

struct ScriptedAuth {
    results: Mutex<Vec<Result<AuthSession, AuthError>>>,
    forms: Mutex<Vec<LoginForm>>,
}

impl ScriptedAuth {
    fn new(results: Vec<Result<AuthSession, AuthError>>) -> Self {
        Self { results: Mutex::new(results), forms: Mutex::new(Vec::new()) }
    }
}

#[async_trait::async_trait]
impl SignIn for ScriptedAuth {
    async fn sign_in(&self, form: &LoginForm) -> Result<AuthSession, AuthError> {
        self.forms.lock().unwrap().push(form.clone());
        self.results.lock().unwrap().remove(0)
    }
}

fn session() -> AuthSession {
    AuthSession { session_id: "sess_1".into(), user_id: "user_1".into() }
}

fn input(text: &str) -> Input<&[u8]> {
    Input::new(text.as_bytes())
}

#[tokio::test]
async fn successful_login_saves_session_and_resolves_identity() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = SessionFile::new(dir.path().join("s.json"));
    let identity = IdentityHandle::new();
    let auth = ScriptedAuth::new(vec![Ok(session())]);
    let mut out = Vec::new();

    let result = run(&mut input("ada@example.com\npassword1\n"), &mut out, &auth, None, &sessions, &identity)
        .await
        .unwrap();

    assert_eq!(result, session());
    assert_eq!(sessions.load().unwrap(), Some(session()));
    assert_eq!(identity.current().as_deref(), Some("user_1"));
    assert_eq!(auth.forms.lock().unwrap()[0], LoginForm::new("ada@example.com", "password1"));
}

#[tokio::test]
async fn short_password_never_reaches_provider() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = SessionFile::new(dir.path().join("s.json"));
    let identity = IdentityHandle::new();
    let auth = ScriptedAuth::new(vec![Ok(session())]);
    let mut out = Vec::new();

    run(
        &mut input("short\npassword1\n"),
        &mut out,
        &auth,
        Some("ada@example.com".into()),
        &sessions,
        &identity,
    )
    .await
    .unwrap();

    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("Password must be at least 8 characters"));
    assert_eq!(auth.forms.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn rejected_attempts_surface_provider_message() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = SessionFile::new(dir.path().join("s.json"));
    let identity = IdentityHandle::new();
    let auth = ScriptedAuth::new(vec![
        Err(AuthError::Rejected("Password is incorrect. Try again.".into())),
        Err(AuthError::Rejected("Password is incorrect. Try again.".into())),
        Err(AuthError::VerificationRequired),
    ]);
    let mut out = Vec::new();

    let err = run(
        &mut input("ada@example.com\nwrongpass1\nwrongpass2\nwrongpass3\n"),
        &mut out,
        &auth,
        None,
        &sessions,
        &identity,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ScreenError::Auth(AuthError::VerificationRequired)));
    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("Password is incorrect. Try again."));
    assert!(printed.contains("Additional verification required"));
    assert!(identity.current().is_none());
    assert!(sessions.load().unwrap().is_none());
}

#[tokio::test]
async fn closed_input_stops_login() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = SessionFile::new(dir.path().join("s.json"));
    let auth = ScriptedAuth::new(Vec::new());
    let mut out = Vec::new();

    let err = run(&mut input(""), &mut out, &auth, None, &sessions, &IdentityHandle::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ScreenError::InputClosed));
}

#[test]
fn failure_toast_titles() {
    assert_eq!(failure_toast(&AuthError::PasswordTooShort).0, "Invalid Password");
    assert_eq!(failure_toast(&AuthError::VerificationRequired).0, "Authentication Error");
    assert_eq!(failure_toast(&AuthError::Rejected("x".into())).0, "Authentication Failed");
}
