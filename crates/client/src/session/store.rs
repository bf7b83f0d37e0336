//! Token store implementations.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{AccessToken, TokenStore, TokenStoreError};
use crate::lock;

/// On-disk shape of the session file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredToken {
    token: String,
    saved_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Persists the token as JSON in a single file.
///
/// A saved token is kept for `ttl` (30 days by default). Once that window
/// passes the entry is treated as absent and removed on the next load.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
    ttl: Duration,
}

impl FileTokenStore {
    /// Create a store backed by `path`. The file is created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    /// Location of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_at(&self, now: DateTime<Utc>) -> Result<Option<AccessToken>, TokenStoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored: StoredToken = serde_json::from_str(&contents)?;
        if stored.expires_at <= now {
            debug!(expired_at = %stored.expires_at, "Stored token past its retention window");
            self.clear()?;
            return Ok(None);
        }

        Ok(Some(AccessToken::new(stored.token)))
    }

    fn save_at(&self, token: &AccessToken, now: DateTime<Utc>) -> Result<(), TokenStoreError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or(TokenStoreError::RetentionOutOfRange)?;
        let stored = StoredToken {
            token: token.expose().to_string(),
            saved_at: now,
            expires_at,
        };
        let json = serde_json::to_vec_pretty(&stored)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to a sibling temp file then rename over the target
        let tmp_path = self.path.with_extension("json.tmp");
        let mut file = create_private(&tmp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<AccessToken>, TokenStoreError> {
        match self.load_at(Utc::now()) {
            Err(TokenStoreError::Corrupt(e)) => {
                warn!(error = %e, path = %self.path.display(), "Discarding unreadable session file");
                self.clear()?;
                Ok(None)
            }
            other => other,
        }
    }

    fn save(&self, token: &AccessToken) -> Result<(), TokenStoreError> {
        self.save_at(token, Utc::now())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}

/// Keeps the token in memory only. Used by tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<AccessToken>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that starts out holding `token`.
    #[must_use]
    pub fn with_token(token: AccessToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<AccessToken>, TokenStoreError> {
        Ok(lock::lock(&self.token).clone())
    }

    fn save(&self, token: &AccessToken) -> Result<(), TokenStoreError> {
        *lock::lock(&self.token) = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        *lock::lock(&self.token) = None;
        Ok(())
    }
}
