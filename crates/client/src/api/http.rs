//! `reqwest` implementation of [`CommerceApi`].
//!
//! Caches the product and category lists using `moka`.

use std::sync::Arc;

use async_trait::async_trait;
use bazaar_core::{Cart, CartItemId, Category, Product};
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::cache::{CacheKey, CacheValue};
use super::types::{SignInBody, SignInResponse, SignUpBody, SignUpResponse};
use super::{AddCartItem, ApiError, CommerceApi, Credentials, Registration, UpdateCartItem};
use crate::config::ApiConfig;
use crate::session::AccessToken;

/// Longest plain-text body that is still shown to the user as a message.
const MAX_PLAIN_MESSAGE_LEN: usize = 200;

// =============================================================================
// HttpCommerceApi
// =============================================================================

/// Client for the commerce REST API.
///
/// Product and category lists are cached for the configured TTL.
#[derive(Clone)]
pub struct HttpCommerceApi {
    inner: Arc<HttpCommerceApiInner>,
}

struct HttpCommerceApiInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl HttpCommerceApi {
    /// Create a new API client.
    #[must_use]
    pub fn new(config: &ApiConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        Self {
            inner: Arc::new(HttpCommerceApiInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                cache,
            }),
        }
    }

    /// Drop the cached product and category lists.
    pub async fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&AccessToken>,
    ) -> Result<RequestBuilder, ApiError> {
        let url = self.inner.base_url.join(path)?;
        let builder = self
            .inner
            .client
            .request(method, url)
            .header("Content-Type", "application/json");

        Ok(match token {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        })
    }

    /// Send a request and return the body of a successful response.
    async fn execute(&self, builder: RequestBuilder) -> Result<String, ApiError> {
        let response = builder.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Commerce API returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: extract_message(&response_text),
            });
        }

        Ok(response_text)
    }

    async fn execute_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response_text = self.execute(builder).await?;
        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse commerce API response"
            );
            ApiError::Parse(e)
        })
    }

    /// Fetch a list, treating a `null` body as empty.
    async fn fetch_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let list: Option<Vec<T>> = self.execute_json(self.request(Method::GET, path, None)?).await?;
        Ok(list.unwrap_or_default())
    }
}

#[async_trait]
impl CommerceApi for HttpCommerceApi {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&CacheKey::Products).await {
            debug!("Cache hit for products");
            return Ok(products.to_vec());
        }

        let products: Vec<Product> = self.fetch_list("product/").await?;
        debug!(count = products.len(), "Fetched products");

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(products.clone().into()))
            .await;

        Ok(products)
    }

    #[instrument(skip(self))]
    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories.to_vec());
        }

        let categories: Vec<Category> = self.fetch_list("category/").await?;
        debug!(count = categories.len(), "Fetched categories");

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone().into()),
            )
            .await;

        Ok(categories)
    }

    #[instrument(skip(self, token))]
    async fn get_cart(&self, token: &AccessToken) -> Result<Cart, ApiError> {
        let cart: Option<Cart> = self
            .execute_json(self.request(Method::GET, "cart/", Some(token))?)
            .await?;
        Ok(cart.unwrap_or_else(Cart::empty))
    }

    #[instrument(skip(self, token), fields(product_id = %item.product_id, quantity = %item.quantity))]
    async fn add_cart_item(&self, token: &AccessToken, item: &AddCartItem) -> Result<(), ApiError> {
        let builder = self.request(Method::POST, "cart/add/", Some(token))?.json(item);
        self.execute(builder).await?;
        Ok(())
    }

    #[instrument(skip(self, token, update), fields(quantity = %update.quantity))]
    async fn update_cart_item(
        &self,
        token: &AccessToken,
        item_id: CartItemId,
        update: &UpdateCartItem,
    ) -> Result<(), ApiError> {
        let path = format!("cart/update/{item_id}/");
        let builder = self.request(Method::PUT, &path, Some(token))?.json(update);
        self.execute(builder).await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn delete_cart_item(
        &self,
        token: &AccessToken,
        item_id: CartItemId,
    ) -> Result<(), ApiError> {
        let path = format!("cart/delete/{item_id}/");
        self.execute(self.request(Method::DELETE, &path, Some(token))?)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn sign_in(&self, credentials: &Credentials) -> Result<AccessToken, ApiError> {
        let builder = self
            .request(Method::POST, "user/signIn/", None)?
            .json(&SignInBody::from(credentials));
        let response: SignInResponse = self.execute_json(builder).await?;
        Ok(AccessToken::new(response.token))
    }

    #[instrument(skip(self, registration), fields(email = %registration.email))]
    async fn sign_up(&self, registration: &Registration) -> Result<String, ApiError> {
        let builder = self
            .request(Method::POST, "user/signup/", None)?
            .json(&SignUpBody::from(registration));
        let response: SignUpResponse = self.execute_json(builder).await?;
        Ok(response.message.unwrap_or_default())
    }
}

/// Pull a human-readable message out of an error body.
///
/// Accepts `{"message": ...}`, a bare JSON string, or short plain text.
fn extract_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let message = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::String(msg)) => Some(msg),
        Ok(serde_json::Value::Object(map)) => map
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string),
        Ok(_) => None,
        Err(_) if body.len() <= MAX_PLAIN_MESSAGE_LEN && !body.starts_with('<') => {
            Some(body.to_string())
        }
        Err(_) => None,
    };
    message.filter(|msg| !msg.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_from_object() {
        assert_eq!(
            extract_message(r#"{"message": "Out of stock", "status": "error"}"#),
            Some("Out of stock".to_string())
        );
        assert_eq!(extract_message(r#"{"status": "error"}"#), None);
    }

    #[test]
    fn test_extract_message_from_string_and_text() {
        assert_eq!(
            extract_message(r#""Invalid quantity""#),
            Some("Invalid quantity".to_string())
        );
        assert_eq!(
            extract_message("Bad credentials"),
            Some("Bad credentials".to_string())
        );
    }

    #[test]
    fn test_extract_message_ignores_html_and_blank() {
        assert_eq!(extract_message("<html><body>502</body></html>"), None);
        assert_eq!(extract_message("   "), None);
        assert_eq!(extract_message(&"x".repeat(500)), None);
    }
}
