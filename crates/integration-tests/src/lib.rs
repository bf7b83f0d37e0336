//! Integration tests for Bazaar.
//!
//! The tests drive [`Storefront`] against [`RecordingApi`], an in-memory
//! commerce API that keeps a real cart, records every call, and can be told
//! to fail or to answer slowly.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth_flow` - login, logout, signup, session restore, login redirects
//! - `cart_sync` - cart mutations, re-fetching, stale responses, expiry
//! - `catalog_view` - catalog loading, filtering, paging, carousel

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bazaar_client::Storefront;
use bazaar_client::api::{
    AddCartItem, ApiError, CommerceApi, Credentials, Registration, UpdateCartItem,
};
use bazaar_client::config::ViewSettings;
use bazaar_client::session::{AccessToken, MemoryTokenStore, TokenStore};
use bazaar_core::{
    Cart, CartItem, CartItemId, Category, CategoryId, Price, Product, ProductId, Quantity,
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde_json::Value;

/// Email of the account every fake starts with.
pub const EMAIL: &str = "shopper@example.com";
/// Password of the account every fake starts with.
pub const PASSWORD: &str = "hunter22";

/// An endpoint of the commerce API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Products,
    Categories,
    Cart,
    AddItem,
    UpdateItem,
    DeleteItem,
    SignIn,
    SignUp,
}

/// A recorded request.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListProducts,
    ListCategories,
    GetCart,
    AddCartItem(Value),
    UpdateCartItem { item_id: CartItemId, body: Value },
    DeleteCartItem { item_id: CartItemId },
    SignIn { email: String },
    SignUp { email: String },
}

impl Call {
    #[must_use]
    pub const fn endpoint(&self) -> Endpoint {
        match self {
            Self::ListProducts => Endpoint::Products,
            Self::ListCategories => Endpoint::Categories,
            Self::GetCart => Endpoint::Cart,
            Self::AddCartItem(_) => Endpoint::AddItem,
            Self::UpdateCartItem { .. } => Endpoint::UpdateItem,
            Self::DeleteCartItem { .. } => Endpoint::DeleteItem,
            Self::SignIn { .. } => Endpoint::SignIn,
            Self::SignUp { .. } => Endpoint::SignUp,
        }
    }
}

/// How a failing endpoint answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// 401 Unauthorized.
    Unauthorized,
    /// Any other status, with an optional `message` body.
    Status(u16, Option<String>),
}

impl Failure {
    fn to_error(&self) -> ApiError {
        match self {
            Self::Unauthorized => ApiError::Unauthorized,
            Self::Status(status, message) => ApiError::Status {
                status: *status,
                message: message.clone(),
            },
        }
    }
}

#[derive(Debug, Default)]
struct Server {
    calls: Vec<Call>,
    products: Vec<Product>,
    categories: Vec<Category>,
    cart: Vec<CartItem>,
    next_item_id: i64,
    users: HashMap<String, String>,
    tokens: HashSet<String>,
    issued: u64,
    failures: HashMap<Endpoint, Failure>,
    delays: HashMap<Endpoint, VecDeque<Duration>>,
}

impl Server {
    fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        self.products
            .iter()
            .find(|product| product.id == id)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: 404,
                message: Some("Product not found".to_string()),
            })
    }

    fn cart(&self) -> Cart {
        let total = self
            .cart
            .iter()
            .map(|item| item.product.price.amount() * Decimal::from(item.quantity.get()))
            .sum();
        Cart {
            cart_items: self.cart.clone(),
            total_cost: Price::new(total).unwrap_or(Price::ZERO),
        }
    }

    fn issue_token(&mut self) -> AccessToken {
        self.issued += 1;
        let token = format!("token-{}", self.issued);
        self.tokens.insert(token.clone());
        AccessToken::new(token)
    }

    fn check(&self, endpoint: Endpoint, token: Option<&AccessToken>) -> Result<(), ApiError> {
        if let Some(failure) = self.failures.get(&endpoint) {
            return Err(failure.to_error());
        }
        match token {
            Some(token) if !self.tokens.contains(token.expose()) => Err(ApiError::Unauthorized),
            _ => Ok(()),
        }
    }

    fn line_mut(&mut self, item_id: CartItemId) -> Result<&mut CartItem, ApiError> {
        self.cart
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| ApiError::Status {
                status: 404,
                message: Some("Cart item not found".to_string()),
            })
    }
}

/// In-memory commerce API that records every request.
#[derive(Debug, Default)]
pub struct RecordingApi {
    server: Mutex<Server>,
}

impl RecordingApi {
    /// An API with a sample catalog, an empty cart and one account
    /// ([`EMAIL`] / [`PASSWORD`]).
    #[must_use]
    pub fn new() -> Self {
        let api = Self::default();
        {
            let mut server = api.server();
            server.products = sample_products();
            server.categories = sample_categories();
            server.next_item_id = 1;
            server
                .users
                .insert(EMAIL.to_string(), PASSWORD.to_string());
        }
        api
    }

    fn server(&self) -> MutexGuard<'_, Server> {
        self.server.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A token the server accepts, as if the user had logged in earlier.
    #[must_use]
    pub fn issue_token(&self) -> AccessToken {
        self.server().issue_token()
    }

    /// Forget every issued token, so authenticated calls answer 401.
    pub fn revoke_tokens(&self) {
        self.server().tokens.clear();
    }

    pub fn set_products(&self, products: Vec<Product>) {
        self.server().products = products;
    }

    /// Put a line in the cart directly, without recording a call.
    pub fn seed_cart(&self, product_id: ProductId, quantity: u32) -> CartItemId {
        let mut server = self.server();
        let id = CartItemId::new(server.next_item_id);
        server.next_item_id += 1;
        let product = server
            .product(product_id)
            .unwrap_or_else(|_| product(product_id.as_i64(), "Unlisted", 100, None));
        server.cart.push(CartItem {
            id,
            product,
            quantity: Quantity::new(quantity).unwrap_or(Quantity::ONE),
        });
        id
    }

    /// Make every request to `endpoint` fail until [`Self::recover`].
    pub fn fail(&self, endpoint: Endpoint, failure: Failure) {
        self.server().failures.insert(endpoint, failure);
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.server().failures.remove(&endpoint);
    }

    /// Delay the next request to `endpoint` by `delay`. Delays queue up, one
    /// per request.
    pub fn delay_next(&self, endpoint: Endpoint, delay: Duration) {
        self.server()
            .delays
            .entry(endpoint)
            .or_default()
            .push_back(delay);
    }

    /// Every request so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.server().calls.clone()
    }

    /// Requests to `endpoint` so far.
    #[must_use]
    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.server()
            .calls
            .iter()
            .filter(|call| call.endpoint() == endpoint)
            .count()
    }

    pub fn clear_calls(&self) {
        self.server().calls.clear();
    }

    /// The server's cart right now.
    #[must_use]
    pub fn server_cart(&self) -> Cart {
        self.server().cart()
    }

    /// Record the call and claim its delay, if any.
    fn begin(&self, call: Call) -> Option<Duration> {
        let mut server = self.server();
        let endpoint = call.endpoint();
        server.calls.push(call);
        server
            .delays
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front)
    }

    async fn wait(delay: Option<Duration>) {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl CommerceApi for RecordingApi {
    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        Self::wait(self.begin(Call::ListProducts)).await;
        let server = self.server();
        server.check(Endpoint::Products, None)?;
        Ok(server.products.clone())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        Self::wait(self.begin(Call::ListCategories)).await;
        let server = self.server();
        server.check(Endpoint::Categories, None)?;
        Ok(server.categories.clone())
    }

    async fn get_cart(&self, token: &AccessToken) -> Result<Cart, ApiError> {
        // Snapshot at request time; a delayed answer is stale by the time it lands.
        let delay = self.begin(Call::GetCart);
        let answer = {
            let server = self.server();
            server.check(Endpoint::Cart, Some(token)).map(|()| server.cart())
        };
        Self::wait(delay).await;
        answer
    }

    async fn add_cart_item(&self, token: &AccessToken, item: &AddCartItem) -> Result<(), ApiError> {
        let body = serde_json::to_value(item)?;
        Self::wait(self.begin(Call::AddCartItem(body))).await;

        let mut server = self.server();
        server.check(Endpoint::AddItem, Some(token))?;
        let product = server.product(item.product_id)?;
        if let Some(line) = server
            .cart
            .iter_mut()
            .find(|line| line.product.id == item.product_id)
        {
            let quantity = line.quantity.get().saturating_add(item.quantity.get());
            line.quantity = Quantity::new(quantity).unwrap_or(line.quantity);
            return Ok(());
        }

        let id = CartItemId::new(server.next_item_id);
        server.next_item_id += 1;
        server.cart.push(CartItem {
            id,
            product,
            quantity: item.quantity,
        });
        Ok(())
    }

    async fn update_cart_item(
        &self,
        token: &AccessToken,
        item_id: CartItemId,
        update: &UpdateCartItem,
    ) -> Result<(), ApiError> {
        let body = serde_json::to_value(update)?;
        Self::wait(self.begin(Call::UpdateCartItem { item_id, body })).await;

        let mut server = self.server();
        server.check(Endpoint::UpdateItem, Some(token))?;
        server.line_mut(item_id)?.quantity = update.quantity;
        Ok(())
    }

    async fn delete_cart_item(&self, token: &AccessToken, item_id: CartItemId) -> Result<(), ApiError> {
        Self::wait(self.begin(Call::DeleteCartItem { item_id })).await;

        let mut server = self.server();
        server.check(Endpoint::DeleteItem, Some(token))?;
        server.line_mut(item_id)?;
        server.cart.retain(|item| item.id != item_id);
        Ok(())
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<AccessToken, ApiError> {
        let email = credentials.email.as_str().to_string();
        Self::wait(self.begin(Call::SignIn { email: email.clone() })).await;

        let mut server = self.server();
        server.check(Endpoint::SignIn, None)?;
        match server.users.get(&email) {
            Some(password) if password == credentials.password.expose_secret() => {
                Ok(server.issue_token())
            }
            _ => Err(ApiError::Unauthorized),
        }
    }

    async fn sign_up(&self, registration: &Registration) -> Result<String, ApiError> {
        let email = registration.email.as_str().to_string();
        Self::wait(self.begin(Call::SignUp { email: email.clone() })).await;

        let mut server = self.server();
        server.check(Endpoint::SignUp, None)?;
        if server.users.contains_key(&email) {
            return Err(ApiError::Status {
                status: 400,
                message: Some("User already exists".to_string()),
            });
        }
        server.users.insert(
            email,
            registration.password.expose_secret().to_string(),
        );
        Ok("User registered successfully".to_string())
    }
}

/// A storefront over `api` and `store` with default view settings.
#[must_use]
pub fn storefront(api: &Arc<RecordingApi>, store: Arc<dyn TokenStore>) -> Storefront {
    Storefront::with_parts(
        Arc::clone(api) as Arc<dyn CommerceApi>,
        store,
        ViewSettings::default(),
    )
}

/// A storefront with no saved session.
#[must_use]
pub fn logged_out(api: &Arc<RecordingApi>) -> Storefront {
    storefront(api, Arc::new(MemoryTokenStore::new()))
}

/// A storefront restored from a saved session the server accepts.
#[must_use]
pub fn logged_in(api: &Arc<RecordingApi>) -> Storefront {
    storefront(api, Arc::new(MemoryTokenStore::with_token(api.issue_token())))
}

/// A product priced in cents.
#[must_use]
pub fn product(id: i64, name: &str, cents: i64, category: Option<i64>) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        description: format!("{name} description"),
        price: Price::new(Decimal::new(cents, 2)).unwrap_or(Price::ZERO),
        image_url: format!("https://cdn.example.com/{id}.jpg"),
        category_id: category.map(CategoryId::new),
    }
}

#[must_use]
pub fn category(id: i64, name: &str) -> Category {
    Category {
        id: CategoryId::new(id),
        category_name: name.to_string(),
        description: String::new(),
        image_url: String::new(),
        products: Vec::new(),
    }
}

/// Twenty products: teas in category 1, coffees in category 2, and a few
/// uncategorized mugs.
#[must_use]
pub fn sample_products() -> Vec<Product> {
    let mut products = Vec::new();
    for i in 1..=8 {
        products.push(product(i, &format!("Green Tea {i}"), 450 + i * 10, Some(1)));
    }
    for i in 9..=17 {
        products.push(product(i, &format!("Coffee Blend {i}"), 1200 + i, Some(2)));
    }
    for i in 18..=20 {
        products.push(product(i, &format!("Mug {i}"), 999, None));
    }
    products
}

#[must_use]
pub fn sample_categories() -> Vec<Category> {
    vec![category(1, "Tea"), category(2, "Coffee")]
}
