//! Commerce API client.
//!
//! # Architecture
//!
//! - [`CommerceApi`] is the seam between the state slices and the network;
//!   the slices hold an `Arc<dyn CommerceApi>` so tests can swap in a fake
//! - [`HttpCommerceApi`] is the `reqwest` implementation: JSON bodies, bearer
//!   `Authorization` header on cart calls
//! - Product and category lists are cached in memory via `moka`
//!
//! # Endpoints
//!
//! | Method | Path | Purpose |
//! |---|---|---|
//! | GET | `product/` | list products |
//! | GET | `category/` | list categories |
//! | GET | `cart/` | current cart (auth) |
//! | POST | `cart/add/` | add `{productId, quantity}` |
//! | PUT | `cart/update/{itemId}/` | update `{id, productId, quantity}` |
//! | DELETE | `cart/delete/{itemId}/` | remove item |
//! | POST | `user/signIn/` | login `{email, password}` |
//! | POST | `user/signup/` | register `{email, firstName, lastName, password}` |

mod cache;
mod http;
pub mod types;

pub use http::HttpCommerceApi;
pub use types::*;

use async_trait::async_trait;
use bazaar_core::{Cart, CartItemId, Category, Product};
use thiserror::Error;

use crate::session::AccessToken;

/// Errors that can occur when talking to the commerce API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("(no message)"))]
    Status {
        status: u16,
        /// Message extracted from the response body, if any.
        message: Option<String>,
    },

    /// The server rejected the bearer token.
    #[error("Unauthorized")]
    Unauthorized,

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// The message the server supplied for a failed request, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status {
                message: Some(msg), ..
            } => Some(msg.as_str()),
            _ => None,
        }
    }

    /// Failures worth capturing: transport errors, undecodable bodies, 5xx.
    #[must_use]
    pub const fn is_server_fault(&self) -> bool {
        match self {
            Self::Http(_) | Self::Parse(_) | Self::InvalidUrl(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Unauthorized => false,
        }
    }
}

/// Operations the storefront needs from the commerce API.
///
/// Cart mutations return nothing: the caller always re-fetches the cart and
/// never renders a mutation's response body.
#[async_trait]
pub trait CommerceApi: Send + Sync {
    /// `GET product/`
    async fn list_products(&self) -> Result<Vec<Product>, ApiError>;

    /// `GET category/`
    async fn list_categories(&self) -> Result<Vec<Category>, ApiError>;

    /// `GET cart/`
    async fn get_cart(&self, token: &AccessToken) -> Result<Cart, ApiError>;

    /// `POST cart/add/`
    async fn add_cart_item(&self, token: &AccessToken, item: &AddCartItem) -> Result<(), ApiError>;

    /// `PUT cart/update/{id}/`
    async fn update_cart_item(
        &self,
        token: &AccessToken,
        item_id: CartItemId,
        update: &UpdateCartItem,
    ) -> Result<(), ApiError>;

    /// `DELETE cart/delete/{id}/`
    async fn delete_cart_item(&self, token: &AccessToken, item_id: CartItemId)
    -> Result<(), ApiError>;

    /// `POST user/signIn/`, returning the issued token.
    async fn sign_in(&self, credentials: &Credentials) -> Result<AccessToken, ApiError>;

    /// `POST user/signup/`, returning the server's confirmation message.
    async fn sign_up(&self, registration: &Registration) -> Result<String, ApiError>;
}
