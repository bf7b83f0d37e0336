//! Request and response bodies for the commerce API.

use bazaar_core::{CartItemId, Email, ProductId, Quantity};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Body of `POST cart/add/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItem {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// Body of `PUT cart/update/{id}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// Login form contents.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: Email,
    pub password: SecretString,
}

/// Signup form contents, already validated.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub password: SecretString,
}

// =============================================================================
// Wire formats
// =============================================================================

#[derive(Serialize)]
pub(crate) struct SignInBody<'a> {
    email: &'a str,
    password: &'a str,
}

impl<'a> From<&'a Credentials> for SignInBody<'a> {
    fn from(credentials: &'a Credentials) -> Self {
        Self {
            email: credentials.email.as_str(),
            password: credentials.password.expose_secret(),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct SignInResponse {
    pub token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignUpBody<'a> {
    email: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    password: &'a str,
}

impl<'a> From<&'a Registration> for SignUpBody<'a> {
    fn from(registration: &'a Registration) -> Self {
        Self {
            email: registration.email.as_str(),
            first_name: &registration.first_name,
            last_name: &registration.last_name,
            password: registration.password.expose_secret(),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct SignUpResponse {
    #[serde(default)]
    pub message: Option<String>,
}
