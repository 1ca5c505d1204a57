use super::*;
use crate::test_support::env_lock;
use std::time::Duration;

// =============================================================================
// LoginForm
// =============================================================================

#[test]
fn login_form_ready_requires_email_shape_and_password_length() {
    assert!(LoginForm::new("ada@example.com", "longenough").is_ready());
    assert!(!LoginForm::new("ada@example", "longenough").is_ready());
    assert!(!LoginForm::new("ada.example.com", "longenough").is_ready());
    assert!(!LoginForm::new("ada@example.com", "short").is_ready());
    assert!(!LoginForm::default().is_ready());
}

#[test]
fn login_form_validate_reports_short_password() {
    let err = LoginForm::new("ada@example.com", "1234567").validate().unwrap_err();
    assert!(matches!(err, AuthError::PasswordTooShort));
    assert_eq!(err.to_string(), "Password must be at least 8 characters");
}

#[test]
fn login_form_trims_email() {
    let form = LoginForm::new("  ada@example.com ", "password1");
    assert_eq!(form.email, "ada@example.com");
    assert!(form.validate().is_ok());
}

// =============================================================================
// AuthConfig::from_env
// =============================================================================

#[test]
fn auth_config_from_env_trims_trailing_slash() {
    let _guard = env_lock();
    unsafe {
        std::env::set_var("AUTH_BASE_URL", "https://clerk.example.com/");
    }
    let config = AuthConfig::from_env().unwrap();
    assert_eq!(config.sign_in_url(), "https://clerk.example.com/v1/client/sign_ins");
    unsafe {
        std::env::remove_var("AUTH_BASE_URL");
    }
}

#[test]
fn auth_config_from_env_missing_returns_none() {
    let _guard = env_lock();
    unsafe {
        std::env::remove_var("AUTH_BASE_URL");
    }
    assert!(AuthConfig::from_env().is_none());
    unsafe {
        std::env::set_var("AUTH_BASE_URL", "  ");
    }
    assert!(AuthConfig::from_env().is_none());
    unsafe {
        std::env::remove_var("AUTH_BASE_URL");
    }
}

// =============================================================================
// Response parsing
// =============================================================================

#[test]
fn parse_sign_in_complete_matches_session_user() {
    let body = r#"{
        "response": {"object": "sign_in_attempt", "status": "complete", "created_session_id": "sess_2"},
        "client": {"sessions": [
            {"id": "sess_1", "user": {"id": "user_old"}},
            {"id": "sess_2", "user": {"id": "user_42"}}
        ]}
    }"#;
    let session = parse_sign_in_response(body).unwrap();
    assert_eq!(session, AuthSession { session_id: "sess_2".into(), user_id: "user_42".into() });
}

#[test]
fn parse_sign_in_falls_back_to_flat_user_id() {
    let body = r#"{"status": "complete", "created_session_id": "sess_9", "user_id": "user_9"}"#;
    let session = parse_sign_in_response(body).unwrap();
    assert_eq!(session.user_id, "user_9");
}

#[test]
fn parse_sign_in_incomplete_requires_verification() {
    let body = r#"{"response": {"status": "needs_second_factor", "created_session_id": null}}"#;
    assert!(matches!(parse_sign_in_response(body), Err(AuthError::VerificationRequired)));
}

#[test]
fn parse_sign_in_complete_without_session_is_response_error() {
    let body = r#"{"response": {"status": "complete"}}"#;
    assert!(matches!(parse_sign_in_response(body), Err(AuthError::Response(_))));
}

#[test]
fn parse_sign_in_garbage_is_response_error() {
    assert!(matches!(parse_sign_in_response("<html>"), Err(AuthError::Response(_))));
}

#[test]
fn parse_error_prefers_long_message() {
    let body = r#"{"errors": [{"message": "Incorrect", "long_message": "Password is incorrect. Try again.", "code": "form_password_incorrect"}]}"#;
    let err = parse_error_response(body, 422);
    assert_eq!(err.to_string(), "Password is incorrect. Try again.");
}

#[test]
fn parse_error_falls_back_to_status() {
    let err = parse_error_response("oops", 503);
    assert_eq!(err.to_string(), "sign-in failed with status 503");
}

// =============================================================================
// SessionFile
// =============================================================================

#[test]
fn session_file_save_load_clear() {
    let dir = tempfile::tempdir().unwrap();
    let file = SessionFile::new(dir.path().join("session.json"));
    assert!(file.load().unwrap().is_none());

    let session = AuthSession { session_id: "sess_1".into(), user_id: "user_1".into() };
    file.save(&session).unwrap();
    assert_eq!(file.load().unwrap(), Some(session));

    file.clear().unwrap();
    assert!(file.load().unwrap().is_none());
    file.clear().unwrap();
}

#[test]
fn session_file_rejects_corrupt_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(SessionFile::new(path).load(), Err(AuthError::SessionParse(_))));
}

#[test]
fn session_file_from_env_uses_default_path() {
    let _guard = env_lock();
    unsafe {
        std::env::remove_var("CHATBUDDY_SESSION_FILE");
    }
    assert_eq!(SessionFile::from_env().path(), Path::new(".chatbuddy-session.json"));
    unsafe {
        std::env::set_var("CHATBUDDY_SESSION_FILE", "/tmp/cb.json");
    }
    assert_eq!(SessionFile::from_env().path(), Path::new("/tmp/cb.json"));
    unsafe {
        std::env::remove_var("CHATBUDDY_SESSION_FILE");
    }
}

// =============================================================================
// IdentityHandle
// =============================================================================

#[test]
fn identity_resolve_and_sign_out() {
    let identity = IdentityHandle::new();
    assert_eq!(identity.current(), None);
    identity.resolve("user_1");
    assert_eq!(identity.current().as_deref(), Some("user_1"));
    identity.sign_out();
    assert_eq!(identity.current(), None);
}

#[tokio::test]
async fn identity_wait_returns_immediately_when_resolved() {
    let identity = IdentityHandle::resolved("user_1");
    let id = tokio::time::timeout(Duration::from_millis(200), identity.wait())
        .await
        .expect("wait should not block");
    assert_eq!(id, "user_1");
}

#[tokio::test]
async fn identity_wait_blocks_until_resolved() {
    let identity = IdentityHandle::new();
    let waiter = identity.clone();
    let task = tokio::spawn(async move { waiter.wait().await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!task.is_finished());

    identity.resolve("user_late");
    let id = tokio::time::timeout(Duration::from_millis(200), task)
        .await
        .expect("wait should finish after resolve")
        .unwrap();
    assert_eq!(id, "user_late");
}
