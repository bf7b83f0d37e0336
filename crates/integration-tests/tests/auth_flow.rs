//! Integration tests for login, logout, signup and the login redirect that
//! finishes an interrupted add-to-cart.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use bazaar_client::auth::{AuthEvent, SignupForm};
use bazaar_client::error::{AuthError, messages};
use bazaar_client::redirect::LoginRedirect;
use bazaar_client::session::{FileTokenStore, MemoryTokenStore, TokenStore};
use bazaar_client::{AddToCartOutcome, StoreError};
use bazaar_core::ProductId;
use bazaar_integration_tests::{
    Call, EMAIL, Endpoint, Failure, PASSWORD, RecordingApi, logged_in, logged_out, storefront,
};
use chrono::Duration;
use secrecy::SecretString;

fn password() -> SecretString {
    SecretString::from(PASSWORD)
}

// =============================================================================
// Login / Logout
// =============================================================================

#[tokio::test]
async fn test_login_persists_token_and_fetches_cart() {
    let api = Arc::new(RecordingApi::new());
    let store = Arc::new(MemoryTokenStore::new());
    let storefront = storefront(&api, Arc::clone(&store) as Arc<dyn TokenStore>);

    storefront.login(EMAIL, password()).await.unwrap();

    assert!(storefront.auth().is_logged_in());
    assert!(store.load().unwrap().is_some());
    assert_eq!(
        api.calls(),
        vec![
            Call::SignIn {
                email: EMAIL.to_string()
            },
            Call::GetCart,
        ]
    );
    assert!(storefront.cart().cart().unwrap().is_empty());
}

#[tokio::test]
async fn test_login_wrong_password() {
    let api = Arc::new(RecordingApi::new());
    let storefront = logged_out(&api);

    let err = storefront
        .login(EMAIL, SecretString::from("nope"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Auth(AuthError::InvalidCredentials)));
    assert!(!storefront.auth().is_logged_in());
    assert_eq!(api.count(Endpoint::Cart), 0);
    assert_eq!(
        err.user_message(messages::LOGIN_FAILED),
        "Invalid email or password"
    );
}

#[tokio::test]
async fn test_login_invalid_email_sends_nothing() {
    let api = Arc::new(RecordingApi::new());
    let storefront = logged_out(&api);

    let err = storefront
        .login("not-an-email", password())
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Auth(AuthError::InvalidEmail(_))));
    assert_eq!(err.user_message(messages::LOGIN_FAILED), "Invalid email address");
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_login_server_down() {
    let api = Arc::new(RecordingApi::new());
    api.fail(Endpoint::SignIn, Failure::Status(502, None));
    let storefront = logged_out(&api);

    let err = storefront.login(EMAIL, password()).await.unwrap_err();

    assert!(matches!(err, StoreError::Auth(AuthError::Unavailable(_))));
    assert_eq!(err.user_message(messages::LOGIN_FAILED), messages::LOGIN_FAILED);
    assert!(!storefront.auth().is_logged_in());
}

#[tokio::test]
async fn test_login_forbidden_without_message() {
    let api = Arc::new(RecordingApi::new());
    api.fail(Endpoint::SignIn, Failure::Status(403, None));
    let storefront = logged_out(&api);

    let err = storefront.login(EMAIL, password()).await.unwrap_err();

    assert!(matches!(err, StoreError::Auth(AuthError::InvalidCredentials)));
    assert_eq!(api.count(Endpoint::Cart), 0);
}

#[tokio::test]
async fn test_logout_makes_no_requests() {
    let api = Arc::new(RecordingApi::new());
    api.seed_cart(ProductId::new(1), 2);
    let store = Arc::new(MemoryTokenStore::with_token(api.issue_token()));
    let storefront = storefront(&api, Arc::clone(&store) as Arc<dyn TokenStore>);
    storefront.start().await;
    assert!(storefront.cart().cart().is_some());
    api.clear_calls();

    storefront.logout();

    assert!(api.calls().is_empty());
    assert!(!storefront.auth().is_logged_in());
    assert!(store.load().unwrap().is_none());
    let snapshot = storefront.cart().snapshot();
    assert!(snapshot.cart.is_none());
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_auth_hooks_fire_in_order() {
    let api = Arc::new(RecordingApi::new());
    let storefront = logged_out(&api);
    let events = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&events);
    storefront
        .auth()
        .on_change(move |event| seen.lock().unwrap().push(event));

    storefront.login(EMAIL, password()).await.unwrap();
    storefront.logout();

    assert_eq!(
        *events.lock().unwrap(),
        vec![AuthEvent::LoggedIn, AuthEvent::LoggedOut]
    );
}

#[tokio::test]
async fn test_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let api = Arc::new(RecordingApi::new());

    let first = storefront(
        &api,
        Arc::new(FileTokenStore::new(&path, Duration::days(30))),
    );
    first.login(EMAIL, password()).await.unwrap();
    drop(first);

    let second = storefront(
        &api,
        Arc::new(FileTokenStore::new(&path, Duration::days(30))),
    );
    assert!(second.auth().is_logged_in());
    second.start().await;
    assert!(second.cart().cart().is_some());
}

// =============================================================================
// Login redirect
// =============================================================================

#[tokio::test]
async fn test_add_while_logged_out_replays_once_after_login() {
    let api = Arc::new(RecordingApi::new());
    let storefront = logged_out(&api);

    let outcome = storefront
        .add_to_cart(ProductId::new(3), 2, "/?category=1")
        .await
        .unwrap();
    assert!(api.calls().is_empty());

    let AddToCartOutcome::LoginRequired(redirect) = outcome else {
        panic!("expected a login redirect, got {outcome:?}");
    };
    // The login page is reached through its URL.
    let redirect = LoginRedirect::parse(&redirect.to_path());

    let outcome = storefront
        .login_with_redirect(EMAIL, password(), redirect)
        .await
        .unwrap();

    assert_eq!(outcome.redirect, "/?category=1");
    assert!(matches!(outcome.replayed, Some(Ok(()))));
    assert_eq!(api.count(Endpoint::AddItem), 1);
    assert_eq!(
        storefront
            .cart()
            .item_for_product(ProductId::new(3))
            .map(|item| item.quantity.get()),
        Some(2)
    );
}

#[tokio::test]
async fn test_failed_replay_keeps_login() {
    let api = Arc::new(RecordingApi::new());
    api.fail(Endpoint::AddItem, Failure::Status(500, None));
    let storefront = logged_out(&api);

    let outcome = storefront
        .login_with_redirect(
            EMAIL,
            password(),
            LoginRedirect::for_add_to_cart("/", ProductId::new(1), 1),
        )
        .await
        .unwrap();

    assert!(storefront.auth().is_logged_in());
    assert!(matches!(outcome.replayed, Some(Err(_))));
    assert_eq!(storefront.cart().error().as_deref(), Some(messages::ADD_FAILED));
    assert_eq!(api.count(Endpoint::AddItem), 1);
}

#[tokio::test]
async fn test_failed_login_drops_intent() {
    let api = Arc::new(RecordingApi::new());
    let storefront = logged_out(&api);

    let result = storefront
        .login_with_redirect(
            EMAIL,
            SecretString::from("wrong"),
            LoginRedirect::for_add_to_cart("/", ProductId::new(1), 1),
        )
        .await;

    assert!(result.is_err());
    assert_eq!(api.count(Endpoint::AddItem), 0);
}

#[tokio::test]
async fn test_login_without_intent_goes_home() {
    let api = Arc::new(RecordingApi::new());
    let storefront = logged_out(&api);

    let outcome = storefront
        .login_with_redirect(EMAIL, password(), LoginRedirect::parse("/login"))
        .await
        .unwrap();

    assert_eq!(outcome.redirect, "/");
    assert!(outcome.replayed.is_none());
}

#[tokio::test]
async fn test_already_logged_in_add_goes_straight_through() {
    let api = Arc::new(RecordingApi::new());
    let storefront = logged_in(&api);

    let outcome = storefront.add_to_cart(ProductId::new(1), 1, "/").await.unwrap();

    assert_eq!(outcome, AddToCartOutcome::Added);
}

// =============================================================================
// Signup
// =============================================================================

fn form(email: &str, password: &str, confirm: &str) -> SignupForm {
    SignupForm {
        email: email.to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        password: SecretString::from(password),
        confirm_password: SecretString::from(confirm),
    }
}

#[tokio::test]
async fn test_signup_then_login() {
    let api = Arc::new(RecordingApi::new());
    let storefront = logged_out(&api);

    let message = storefront
        .auth()
        .signup(&form("ada@example.com", "engine", "engine"))
        .await
        .unwrap();

    assert_eq!(message, "User registered successfully");
    assert!(!storefront.auth().is_logged_in());
    storefront
        .login("ada@example.com", SecretString::from("engine"))
        .await
        .unwrap();
    assert!(storefront.auth().is_logged_in());
}

#[tokio::test]
async fn test_signup_mismatch_sends_nothing() {
    let api = Arc::new(RecordingApi::new());
    let storefront = logged_out(&api);

    let err = storefront
        .auth()
        .signup(&form("ada@example.com", "engine", "engines"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Auth(AuthError::PasswordMismatch)));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_signup_duplicate_shows_server_message() {
    let api = Arc::new(RecordingApi::new());
    let storefront = logged_out(&api);

    let err = storefront
        .auth()
        .signup(&form(EMAIL, "again", "again"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Auth(AuthError::Rejected(_))));
    assert_eq!(err.user_message(messages::SIGNUP_FAILED), "User already exists");
}

#[tokio::test]
async fn test_signup_server_down_uses_fallback() {
    let api = Arc::new(RecordingApi::new());
    api.fail(Endpoint::SignUp, Failure::Status(500, None));
    let storefront = logged_out(&api);

    let err = storefront
        .auth()
        .signup(&form("ada@example.com", "engine", "engine"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Auth(AuthError::Unavailable(_))));
    assert_eq!(err.user_message(messages::SIGNUP_FAILED), messages::SIGNUP_FAILED);
}
