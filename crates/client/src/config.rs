//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAZAAR_API_URL` - Base URL of the commerce API (e.g., `https://api.example.com/api/`)
//!
//! ## Optional
//! - `BAZAAR_DATA_DIR` - Where the access token is persisted (default: `<data dir>/bazaar`)
//! - `BAZAAR_SEARCH_DEBOUNCE_MS` - Quiet period before a search applies (default: 300)
//! - `BAZAAR_QUANTITY_DEBOUNCE_MS` - Quiet period before a typed quantity applies (default: 800)
//! - `BAZAAR_ITEMS_PER_PAGE` - Catalog page size (default: 8)
//! - `BAZAAR_TOKEN_TTL_DAYS` - Lifetime of the persisted token (default: 30)
//! - `BAZAAR_CATALOG_CACHE_SECS` - How long product/category lists are reused (default: 60)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
const DEFAULT_QUANTITY_DEBOUNCE_MS: u64 = 800;
const DEFAULT_ITEMS_PER_PAGE: usize = 8;
const DEFAULT_TOKEN_TTL_DAYS: u32 = 30;
const MAX_TOKEN_TTL_DAYS: u32 = 3650;
const DEFAULT_CATALOG_CACHE_SECS: u64 = 60;

/// Distance from the bottom of the document, in pixels, that triggers the
/// next catalog page.
pub const SCROLL_THRESHOLD_PX: f64 = 1000.0;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("No data directory available; set BAZAAR_DATA_DIR")]
    NoDataDir,
}

/// Top-level client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Commerce API configuration
    pub api: ApiConfig,
    /// Directory holding the persisted token
    pub data_dir: PathBuf,
    /// Lifetime of the persisted token
    pub token_ttl: chrono::Duration,
    /// Catalog and cart view behavior
    pub views: ViewSettings,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Commerce API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL, always ending in `/` so relative paths join beneath it
    pub base_url: Url,
    /// How long catalog lists stay cached
    pub catalog_cache_ttl: Duration,
}

/// Tunables for the view controllers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSettings {
    /// Products per catalog page
    pub items_per_page: usize,
    /// Quiet period for search input
    pub search_debounce: Duration,
    /// Quiet period for typed quantities
    pub quantity_debounce: Duration,
    /// Infinite scroll trigger distance
    pub scroll_threshold_px: f64,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            quantity_debounce: Duration::from_millis(DEFAULT_QUANTITY_DEBOUNCE_MS),
            scroll_threshold_px: SCROLL_THRESHOLD_PX,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = ApiConfig::from_env()?;
        let data_dir = match get_optional_env("BAZAAR_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .map(|dir| dir.join("bazaar"))
                .ok_or(ConfigError::NoDataDir)?,
        };
        let token_ttl = token_ttl(get_parsed_or_default(
            "BAZAAR_TOKEN_TTL_DAYS",
            DEFAULT_TOKEN_TTL_DAYS,
        )?)?;

        Ok(Self {
            api,
            data_dir,
            token_ttl,
            views: ViewSettings::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Path of the persisted token file.
    #[must_use]
    pub fn token_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }
}

impl ApiConfig {
    /// Build an API configuration from a base URL string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL does not parse or is
    /// not http(s).
    pub fn new(base_url: &str, catalog_cache_ttl: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            catalog_cache_ttl,
        })
    }

    fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_required_env("BAZAAR_API_URL")?;
        let cache_secs = get_parsed_or_default("BAZAAR_CATALOG_CACHE_SECS", DEFAULT_CATALOG_CACHE_SECS)?;
        Self::new(&base_url, Duration::from_secs(cache_secs))
    }
}

impl ViewSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let items_per_page = get_parsed_or_default("BAZAAR_ITEMS_PER_PAGE", DEFAULT_ITEMS_PER_PAGE)?;
        if items_per_page == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BAZAAR_ITEMS_PER_PAGE".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            items_per_page,
            search_debounce: Duration::from_millis(get_parsed_or_default(
                "BAZAAR_SEARCH_DEBOUNCE_MS",
                DEFAULT_SEARCH_DEBOUNCE_MS,
            )?),
            quantity_debounce: Duration::from_millis(get_parsed_or_default(
                "BAZAAR_QUANTITY_DEBOUNCE_MS",
                DEFAULT_QUANTITY_DEBOUNCE_MS,
            )?),
            scroll_threshold_px: SCROLL_THRESHOLD_PX,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the API base URL and make sure relative endpoint paths resolve
/// beneath it rather than replacing its last segment.
fn normalize_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar("BAZAAR_API_URL".to_string(), reason);

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Get a required environment variable.
/// Token retention window, between one day and ten years.
fn token_ttl(days: u32) -> Result<chrono::Duration, ConfigError> {
    if (1..=MAX_TOKEN_TTL_DAYS).contains(&days) {
        Ok(chrono::Duration::days(i64::from(days)))
    } else {
        Err(ConfigError::InvalidEnvVar(
            "BAZAAR_TOKEN_TTL_DAYS".to_string(),
            format!("must be between 1 and {MAX_TOKEN_TTL_DAYS}"),
        ))
    }
}

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get and parse an environment variable, falling back to a default.
fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_trailing_slash() {
        let url = normalize_base_url("https://api.example.com/api").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/");
        assert_eq!(
            url.join("cart/add/").unwrap().as_str(),
            "https://api.example.com/api/cart/add/"
        );
    }

    #[test]
    fn test_normalize_keeps_existing_slash_and_drops_query() {
        let url = normalize_base_url("http://localhost:8080/?debug=1").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_normalize_rejects_other_schemes() {
        let err = normalize_base_url("ftp://example.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn test_token_ttl_bounds() {
        assert_eq!(token_ttl(30).unwrap(), chrono::Duration::days(30));
        assert!(token_ttl(MAX_TOKEN_TTL_DAYS).is_ok());
        assert!(token_ttl(0).is_err());
        assert!(matches!(
            token_ttl(100_000_000),
            Err(ConfigError::InvalidEnvVar(ref key, _)) if key == "BAZAAR_TOKEN_TTL_DAYS"
        ));
    }

    #[test]
    fn test_view_settings_defaults() {
        let settings = ViewSettings::default();
        assert_eq!(settings.items_per_page, 8);
        assert_eq!(settings.search_debounce, Duration::from_millis(300));
        assert_eq!(settings.quantity_debounce, Duration::from_millis(800));
    }

    #[test]
    fn test_token_path() {
        let config = ClientConfig {
            api: ApiConfig::new("https://api.example.com", Duration::from_secs(60)).unwrap(),
            data_dir: PathBuf::from("/tmp/bazaar"),
            token_ttl: chrono::Duration::days(30),
            views: ViewSettings::default(),
            sentry_dsn: None,
            sentry_environment: None,
        };
        assert_eq!(config.token_path(), PathBuf::from("/tmp/bazaar/session.json"));
    }
}
