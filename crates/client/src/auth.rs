//! Auth state: the logged-in flag, login/logout/signup, and auth hooks.
//!
//! Logged-in is derived from the token store on construction and then kept
//! in step with it. Downstream slices subscribe with [`AuthState::on_change`]
//! instead of polling the flag.

use std::sync::{Arc, RwLock};

use bazaar_core::Email;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument, warn};

use crate::api::{ApiError, CommerceApi, Credentials, Registration};
use crate::error::{AuthError, Result, StoreError, add_breadcrumb};
use crate::lock;
use crate::session::{AccessToken, TokenStore};

/// A transition of the logged-in flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    LoggedIn,
    LoggedOut,
}

type Listener = Box<dyn Fn(AuthEvent) + Send + Sync>;

/// Signup form contents as typed by the user.
#[derive(Debug, Clone)]
pub struct SignupForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

impl SignupForm {
    /// Check the form before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` for a malformed email, a blank name or password,
    /// or a confirmation that does not match.
    pub fn validate(&self) -> std::result::Result<Registration, AuthError> {
        let email = Email::parse(&self.email)?;
        let first_name = self.first_name.trim();
        let last_name = self.last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(AuthError::MissingName);
        }
        if self.password.expose_secret().is_empty() {
            return Err(AuthError::MissingPassword);
        }
        if self.password.expose_secret() != self.confirm_password.expose_secret() {
            return Err(AuthError::PasswordMismatch);
        }

        Ok(Registration {
            email,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            password: self.password.clone(),
        })
    }
}

/// Shared handle to the auth slice.
#[derive(Clone)]
pub struct AuthState {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    api: Arc<dyn CommerceApi>,
    store: Arc<dyn TokenStore>,
    token: RwLock<Option<AccessToken>>,
    listeners: RwLock<Vec<Listener>>,
}

impl AuthState {
    /// Create the auth slice, trusting whatever token the store holds.
    #[must_use]
    pub fn new(api: Arc<dyn CommerceApi>, store: Arc<dyn TokenStore>) -> Self {
        let token = match store.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Could not read stored session, starting logged out");
                None
            }
        };

        if let Some(expiry) = token.as_ref().and_then(AccessToken::jwt_expiry)
            && expiry <= Utc::now()
        {
            warn!(%expiry, "Stored token claims to be expired; keeping it until the server rejects it");
        }

        Self {
            inner: Arc::new(AuthInner {
                api,
                store,
                token: RwLock::new(token),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        lock::read(&self.inner.token).is_some()
    }

    /// The current token, if logged in.
    #[must_use]
    pub fn token(&self) -> Option<AccessToken> {
        lock::read(&self.inner.token).clone()
    }

    /// Register a hook run synchronously on every login and logout.
    ///
    /// Hooks must not register further hooks.
    pub fn on_change(&self, listener: impl Fn(AuthEvent) + Send + Sync + 'static) {
        lock::write(&self.inner.listeners).push(Box::new(listener));
    }

    /// Log in with email and password.
    ///
    /// On success the token is persisted and the `LoggedIn` hook fires. On
    /// failure nothing changes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Auth` for invalid input, rejected credentials or
    /// an unreachable auth endpoint.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: SecretString) -> Result<()> {
        let credentials = Credentials {
            email: Email::parse(email).map_err(AuthError::from)?,
            password,
        };
        if credentials.password.expose_secret().is_empty() {
            return Err(AuthError::MissingPassword.into());
        }

        let token = self
            .inner
            .api
            .sign_in(&credentials)
            .await
            .map_err(sign_in_failure)?;

        if let Err(e) = self.inner.store.save(&token) {
            warn!(error = %e, "Could not persist session; it will not survive a restart");
        }
        *lock::write(&self.inner.token) = Some(token);

        info!(email = %credentials.email, "Logged in");
        add_breadcrumb("auth", "Logged in");
        self.emit(AuthEvent::LoggedIn);
        Ok(())
    }

    /// Register a new account. Does not log in.
    ///
    /// Returns the server's confirmation message (possibly empty).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Auth` if the form is invalid (no request is made)
    /// or the API rejects or cannot take the request.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn signup(&self, form: &SignupForm) -> Result<String> {
        let registration = form.validate()?;
        let message = self
            .inner
            .api
            .sign_up(&registration)
            .await
            .map_err(sign_up_failure)?;
        info!("Account created");
        Ok(message)
    }

    /// Forget the session. Synchronous; makes no network call.
    #[instrument(skip(self))]
    pub fn logout(&self) {
        self.clear_session();
        info!("Logged out");
        add_breadcrumb("auth", "Logged out");
    }

    /// End the session after the server rejected the token.
    pub(crate) fn expire(&self) {
        if self.is_logged_in() {
            warn!("Server rejected the session token, logging out");
            self.clear_session();
        }
    }

    fn clear_session(&self) {
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "Could not remove stored session");
        }
        *lock::write(&self.inner.token) = None;
        self.emit(AuthEvent::LoggedOut);
    }

    fn emit(&self, event: AuthEvent) {
        for listener in lock::read(&self.inner.listeners).iter() {
            listener(event);
        }
    }
}

fn sign_in_failure(err: ApiError) -> StoreError {
    let err = match err {
        ApiError::Unauthorized
        | ApiError::Status {
            status: 400..=499,
            message: None,
        } => AuthError::InvalidCredentials,
        ApiError::Status {
            status: 400..=499,
            message: Some(message),
        } => AuthError::Rejected(message),
        other => AuthError::Unavailable(other),
    };
    StoreError::Auth(err)
}

fn sign_up_failure(err: ApiError) -> StoreError {
    let err = match err {
        ApiError::Status {
            status: 400..=499,
            message: Some(message),
        } => AuthError::Rejected(message),
        other => AuthError::Unavailable(other),
    };
    StoreError::Auth(err)
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("logged_in", &self.is_logged_in())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> SignupForm {
        SignupForm {
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: " Lovelace ".to_string(),
            password: SecretString::from("pw"),
            confirm_password: SecretString::from("pw"),
        }
    }

    #[test]
    fn test_signup_form_valid() {
        let registration = form().validate().unwrap();
        assert_eq!(registration.email.as_str(), "ada@example.com");
        assert_eq!(registration.last_name, "Lovelace");
    }

    #[test]
    fn test_signup_form_password_mismatch() {
        let mut form = form();
        form.confirm_password = SecretString::from("other");
        assert!(matches!(form.validate(), Err(AuthError::PasswordMismatch)));
    }

    #[test]
    fn test_signup_form_empty_fields() {
        let mut missing_name = form();
        missing_name.first_name = "  ".to_string();
        assert!(matches!(missing_name.validate(), Err(AuthError::MissingName)));

        let mut missing_password = form();
        missing_password.password = SecretString::from("");
        missing_password.confirm_password = SecretString::from("");
        assert!(matches!(
            missing_password.validate(),
            Err(AuthError::MissingPassword)
        ));

        let mut bad_email = form();
        bad_email.email = "nope".to_string();
        assert!(matches!(bad_email.validate(), Err(AuthError::InvalidEmail(_))));
    }

    #[test]
    fn test_sign_in_failures_are_auth_errors() {
        let forbidden = sign_in_failure(ApiError::Status {
            status: 403,
            message: None,
        });
        assert!(matches!(forbidden, StoreError::Auth(AuthError::InvalidCredentials)));

        let locked = sign_in_failure(ApiError::Status {
            status: 423,
            message: Some("Account locked".to_string()),
        });
        assert!(matches!(
            locked,
            StoreError::Auth(AuthError::Rejected(ref message)) if message == "Account locked"
        ));

        let down = sign_in_failure(ApiError::Status {
            status: 502,
            message: None,
        });
        assert!(matches!(down, StoreError::Auth(AuthError::Unavailable(_))));
    }

    #[test]
    fn test_sign_up_failures_are_auth_errors() {
        let taken = sign_up_failure(ApiError::Status {
            status: 400,
            message: Some("User already exists".to_string()),
        });
        assert!(matches!(taken, StoreError::Auth(AuthError::Rejected(_))));

        let bare = sign_up_failure(ApiError::Status {
            status: 400,
            message: None,
        });
        assert!(matches!(bare, StoreError::Auth(AuthError::Unavailable(_))));
    }
}
