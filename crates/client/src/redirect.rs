//! Login redirects that carry a pending add-to-cart.
//!
//! Adding to the cart while logged out sends the user to
//! `/login?redirect=%2F&productId=<id>&quantity=<n>`. After a successful
//! login the add is replayed once and the user is sent on to `redirect`.

use bazaar_core::ProductId;
use url::form_urlencoded;

const LOGIN_PATH: &str = "/login";
const HOME_PATH: &str = "/";

/// An add-to-cart that was interrupted by the login wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartIntent {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Where to go after logging in, and what to do first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    redirect: String,
    intent: Option<CartIntent>,
}

impl Default for LoginRedirect {
    fn default() -> Self {
        Self::to(HOME_PATH)
    }
}

impl LoginRedirect {
    /// Log in, then go to `path`.
    #[must_use]
    pub fn to(path: &str) -> Self {
        Self {
            redirect: sanitize_path(path),
            intent: None,
        }
    }

    /// Log in, add `quantity` of a product, then go to `path`.
    #[must_use]
    pub fn for_add_to_cart(path: &str, product_id: ProductId, quantity: u32) -> Self {
        Self {
            redirect: sanitize_path(path),
            intent: Some(CartIntent {
                product_id,
                quantity,
            }),
        }
    }

    /// Path to navigate to after login.
    #[must_use]
    pub fn redirect(&self) -> &str {
        &self.redirect
    }

    #[must_use]
    pub const fn intent(&self) -> Option<CartIntent> {
        self.intent
    }

    /// Split into the post-login path and the pending intent.
    #[must_use]
    pub fn into_parts(self) -> (String, Option<CartIntent>) {
        (self.redirect, self.intent)
    }

    /// The login page URL, e.g. `/login?redirect=%2F&productId=3&quantity=1`.
    #[must_use]
    pub fn to_path(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("redirect", &self.redirect);
        if let Some(intent) = self.intent {
            query.append_pair("productId", &intent.product_id.to_string());
            query.append_pair("quantity", &intent.quantity.to_string());
        }
        format!("{LOGIN_PATH}?{}", query.finish())
    }

    /// Read a login URL (or just its query string).
    ///
    /// A missing or unsafe `redirect` becomes `/`. A missing or non-positive
    /// `quantity` becomes 1. Without a numeric `productId` there is no intent.
    #[must_use]
    pub fn parse(url: &str) -> Self {
        let query = url.split_once('?').map_or(url, |(_, query)| query);

        let mut redirect = None;
        let mut product_id = None;
        let mut quantity = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "redirect" => redirect = Some(value.into_owned()),
                "productId" => product_id = value.parse::<ProductId>().ok(),
                "quantity" => quantity = value.trim().parse::<u32>().ok().filter(|q| *q > 0),
                _ => {}
            }
        }

        Self {
            redirect: sanitize_path(redirect.as_deref().unwrap_or(HOME_PATH)),
            intent: product_id.map(|product_id| CartIntent {
                product_id,
                quantity: quantity.unwrap_or(1),
            }),
        }
    }
}

/// Only same-site absolute paths are followed. Browsers read `/\` as `//`.
fn sanitize_path(path: &str) -> String {
    let path = path.trim();
    let mut chars = path.chars();
    if chars.next() == Some('/') && !matches!(chars.next(), Some('/' | '\\')) {
        path.to_string()
    } else {
        HOME_PATH.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_to_cart_redirect_path() {
        let redirect = LoginRedirect::for_add_to_cart("/", ProductId::new(3), 1);
        assert_eq!(
            redirect.to_path(),
            "/login?redirect=%2F&productId=3&quantity=1"
        );
    }

    #[test]
    fn test_plain_redirect_path() {
        assert_eq!(
            LoginRedirect::to("/cart").to_path(),
            "/login?redirect=%2Fcart"
        );
    }

    #[test]
    fn test_parse_reads_intent() {
        let redirect = LoginRedirect::parse("/login?redirect=%2Fproduct%2F7&productId=7&quantity=2");
        assert_eq!(redirect.redirect(), "/product/7");
        assert_eq!(
            redirect.intent(),
            Some(CartIntent {
                product_id: ProductId::new(7),
                quantity: 2
            })
        );
    }

    #[test]
    fn test_parse_defaults() {
        let redirect = LoginRedirect::parse("productId=5&quantity=abc");
        assert_eq!(redirect.redirect(), "/");
        assert_eq!(redirect.intent().map(|i| i.quantity), Some(1));

        let redirect = LoginRedirect::parse("/login?productId=5&quantity=0");
        assert_eq!(redirect.intent().map(|i| i.quantity), Some(1));

        let redirect = LoginRedirect::parse("/login?redirect=%2Fcart");
        assert_eq!(redirect.intent(), None);
    }

    #[test]
    fn test_parse_rejects_offsite_redirect() {
        let redirect = LoginRedirect::parse("/login?redirect=https%3A%2F%2Fevil.example");
        assert_eq!(redirect.redirect(), "/");
        let redirect = LoginRedirect::parse("/login?redirect=%2F%2Fevil.example");
        assert_eq!(redirect.redirect(), "/");
        let redirect = LoginRedirect::parse("/login?redirect=%2F%5Cevil.example");
        assert_eq!(redirect.redirect(), "/");
        let redirect = LoginRedirect::parse("/login?redirect=%2Fcart%5Cnotes");
        assert_eq!(redirect.redirect(), "/cart\\notes");
    }
}
