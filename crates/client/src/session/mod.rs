//! Access token and its persistence.
//!
//! There is exactly one authoritative place a token lives: the configured
//! [`TokenStore`]. Presence of a stored token means "logged in"; its expiry is
//! never checked before trusting it, the server's 401 is what ends a session.

mod store;

pub use store::{FileTokenStore, MemoryTokenStore};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

/// Errors from reading or writing the persisted token.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("Token store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// The retention window runs past the representable date range.
    #[error("Token retention window is out of range")]
    RetentionOutOfRange,
}

/// Opaque bearer token issued by `user/signIn/`.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for the `Authorization` header and persistence.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// The `exp` claim, if the token happens to be a JWT.
    ///
    /// Only used for diagnostics; the signature is not verified.
    #[must_use]
    pub fn jwt_expiry(&self) -> Option<DateTime<Utc>> {
        #[derive(Deserialize)]
        struct Claims {
            exp: i64,
        }

        let payload = self.expose().split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        let claims: Claims = serde_json::from_slice(&bytes).ok()?;
        DateTime::from_timestamp(claims.exp, 0)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AccessToken").field(&"[REDACTED]").finish()
    }
}

/// Durable storage for the single session token.
pub trait TokenStore: Send + Sync {
    /// Read the stored token, if there is one.
    ///
    /// # Errors
    ///
    /// Returns `TokenStoreError` if the backing storage cannot be read.
    fn load(&self) -> Result<Option<AccessToken>, TokenStoreError>;

    /// Replace the stored token.
    ///
    /// # Errors
    ///
    /// Returns `TokenStoreError` if the backing storage cannot be written.
    fn save(&self, token: &AccessToken) -> Result<(), TokenStoreError>;

    /// Remove the stored token. Clearing an empty store is not an error.
    ///
    /// # Errors
    ///
    /// Returns `TokenStoreError` if the backing storage cannot be written.
    fn clear(&self) -> Result<(), TokenStoreError>;
}
