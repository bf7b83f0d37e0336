//! Unified error handling with Sentry integration.
//!
//! Every state slice catches failures at its own boundary and stores a
//! user-facing string. [`StoreError::user_message`] is the single place that
//! turns an error into that string, preferring what the server said and never
//! exposing transport internals.

use bazaar_core::{EmailError, QuantityError};
use thiserror::Error;

use crate::api::ApiError;

/// User-facing default messages, one per operation.
pub mod messages {
    pub const LOAD_PRODUCTS_FAILED: &str = "Something went wrong while loading products";
    pub const LOAD_CATEGORIES_FAILED: &str = "Something went wrong while loading categories";
    pub const LOAD_CART_FAILED: &str = "Something went wrong while loading the cart";
    pub const ADD_FAILED: &str = "Something went wrong while adding to the cart";
    pub const UPDATE_FAILED: &str = "Something went wrong while updating the cart";
    pub const DELETE_FAILED: &str = "Something went wrong while removing the product";
    pub const LOGIN_FAILED: &str = "Something went wrong while logging in";
    pub const SIGNUP_FAILED: &str = "Something went wrong while creating the account";
    pub const NO_MATCHES: &str = "No products match your search";
    pub const EMPTY_CART: &str = "Your cart is empty";
}

/// Authentication failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The server rejected the email/password pair.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The email did not validate locally.
    #[error("Invalid email address: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Password is required")]
    MissingPassword,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("First and last name are required")]
    MissingName,

    /// A cart operation was attempted without a session.
    #[error("Please log in to continue")]
    LoginRequired,

    /// The server answered 401 to an authenticated call.
    #[error("Your session has expired, please log in again")]
    SessionExpired,

    /// The server refused the request with its own explanation.
    #[error("{0}")]
    Rejected(String),

    /// The auth endpoint could not be reached or failed on its side.
    #[error("Authentication service unavailable: {0}")]
    Unavailable(#[source] ApiError),
}

/// Error type for every state-layer operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The commerce API could not be reached or answered with an error.
    #[error("Network error: {0}")]
    Network(#[from] ApiError),

    /// Input was rejected before any request was made.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication failed or is required.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<QuantityError> for StoreError {
    fn from(err: QuantityError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl StoreError {
    /// The string shown to the user for this error.
    ///
    /// A message supplied by the server wins; otherwise `fallback` is used
    /// for transport failures so internals never leak.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Network(err) | Self::Auth(AuthError::Unavailable(err)) => err
                .server_message()
                .map_or_else(|| fallback.to_string(), ToString::to_string),
            Self::Validation(msg) => msg.clone(),
            Self::Auth(AuthError::InvalidEmail(_)) => "Invalid email address".to_string(),
            Self::Auth(err) => err.to_string(),
            Self::NotFound(_) => fallback.to_string(),
        }
    }

    /// Whether this error means the session is gone.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Network(ApiError::Unauthorized) | Self::Auth(AuthError::SessionExpired)
        )
    }

    /// Log the error and capture unexpected failures to Sentry.
    ///
    /// Client-side faults (validation, auth, 4xx) are only logged.
    pub fn report(&self, operation: &str) {
        match self {
            Self::Network(err) | Self::Auth(AuthError::Unavailable(err))
                if err.is_server_fault() =>
            {
                let event_id = sentry::capture_error(self);
                tracing::error!(
                    error = %self,
                    operation,
                    sentry_event_id = %event_id,
                    "Commerce API failure"
                );
            }
            _ => tracing::warn!(error = %self, operation, "Operation failed"),
        }
    }
}

/// Result type alias for `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Record a breadcrumb for a user action.
///
/// Breadcrumbs appear in Sentry reports to show the trail of actions leading
/// up to an error.
pub fn add_breadcrumb(category: &str, message: &str) {
    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::NotFound("product 7".to_string());
        assert_eq!(err.to_string(), "Not found: product 7");

        let err = StoreError::Validation("bad input".to_string());
        assert_eq!(err.to_string(), "Validation error: bad input");
    }

    #[test]
    fn test_user_message_prefers_server_message() {
        let err = StoreError::Network(ApiError::Status {
            status: 400,
            message: Some("Product is out of stock".to_string()),
        });
        assert_eq!(
            err.user_message(messages::ADD_FAILED),
            "Product is out of stock"
        );
    }

    #[test]
    fn test_user_message_hides_transport_details() {
        let err = StoreError::Network(ApiError::Status {
            status: 502,
            message: None,
        });
        assert_eq!(err.user_message(messages::ADD_FAILED), messages::ADD_FAILED);

        let parse = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = StoreError::Network(ApiError::Parse(parse));
        assert_eq!(
            err.user_message(messages::LOAD_CART_FAILED),
            messages::LOAD_CART_FAILED
        );
    }

    #[test]
    fn test_auth_messages() {
        let err = StoreError::Auth(AuthError::PasswordMismatch);
        assert_eq!(err.user_message(messages::SIGNUP_FAILED), "Passwords do not match");

        let err = StoreError::Auth(AuthError::InvalidEmail(EmailError::Empty));
        assert_eq!(err.user_message(messages::LOGIN_FAILED), "Invalid email address");

        let err = StoreError::Auth(AuthError::Unavailable(ApiError::Status {
            status: 503,
            message: None,
        }));
        assert_eq!(err.user_message(messages::LOGIN_FAILED), messages::LOGIN_FAILED);
    }

    #[test]
    fn test_is_unauthorized() {
        assert!(StoreError::Network(ApiError::Unauthorized).is_unauthorized());
        assert!(StoreError::Auth(AuthError::SessionExpired).is_unauthorized());
        assert!(!StoreError::Auth(AuthError::LoginRequired).is_unauthorized());
    }

    #[test]
    fn test_zero_quantity_is_validation_error() {
        let err = StoreError::from(QuantityError::Zero);
        assert!(matches!(err, StoreError::Validation(_)));
    }
}
