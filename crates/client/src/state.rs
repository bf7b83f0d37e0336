//! Application state shared across the front end.

use std::sync::{Arc, RwLock};

use bazaar_core::ProductId;
use secrecy::SecretString;
use tracing::{info, instrument, warn};

use crate::api::{CommerceApi, HttpCommerceApi};
use crate::auth::AuthState;
use crate::cart::CartState;
use crate::catalog::CatalogState;
use crate::config::{ClientConfig, ViewSettings};
use crate::error::{AuthError, Result, StoreError};
use crate::lock;
use crate::redirect::LoginRedirect;
use crate::session::{FileTokenStore, TokenStore};
use crate::views::{CartView, CatalogView, FeaturedCarousel, GrowthStrategy};

/// Result of pressing "add to cart".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddToCartOutcome {
    /// The add was sent and the cart re-fetched.
    Added,
    /// Logged out: nothing was sent. Navigate to the login page, which will
    /// replay the add after a successful login.
    LoginRequired(LoginRedirect),
}

/// Result of a successful login from the login page.
#[derive(Debug)]
pub struct LoginOutcome {
    /// Where to navigate next.
    pub redirect: String,
    /// Result of replaying the pending add-to-cart, if there was one. A failed
    /// replay does not undo the login.
    pub replayed: Option<Result<()>>,
}

/// The single application state: auth, catalog and cart slices wired
/// together over one API client and one token store.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    settings: ViewSettings,
    api: Arc<dyn CommerceApi>,
    http: Option<HttpCommerceApi>,
    auth: AuthState,
    catalog: RwLock<CatalogState>,
    cart: CartState,
}

impl Storefront {
    /// Create the application state from configuration: the HTTP API client
    /// and the file-backed token store.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        let http = HttpCommerceApi::new(&config.api);
        let store = Arc::new(FileTokenStore::new(config.token_path(), config.token_ttl));
        Self::build(Arc::new(http.clone()), Some(http), store, config.views)
    }

    /// Create the application state over any API implementation and token
    /// store.
    #[must_use]
    pub fn with_parts(
        api: Arc<dyn CommerceApi>,
        store: Arc<dyn TokenStore>,
        settings: ViewSettings,
    ) -> Self {
        Self::build(api, None, store, settings)
    }

    fn build(
        api: Arc<dyn CommerceApi>,
        http: Option<HttpCommerceApi>,
        store: Arc<dyn TokenStore>,
        settings: ViewSettings,
    ) -> Self {
        let auth = AuthState::new(Arc::clone(&api), store);
        let catalog = CatalogState::new(Arc::clone(&api));
        let cart = CartState::new(Arc::clone(&api), auth.clone());

        Self {
            inner: Arc::new(StorefrontInner {
                settings,
                api,
                http,
                auth,
                catalog: RwLock::new(catalog),
                cart,
            }),
        }
    }

    /// Activate the catalog and, when a session exists, fetch the cart.
    #[instrument(skip(self))]
    pub async fn start(&self) {
        let catalog = self.catalog();
        let (_, cart) = tokio::join!(catalog.activate(), self.inner.cart.fetch_cart());
        if let Err(e) = cart {
            warn!(error = %e, "Initial cart fetch failed");
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ViewSettings {
        &self.inner.settings
    }

    #[must_use]
    pub fn auth(&self) -> &AuthState {
        &self.inner.auth
    }

    #[must_use]
    pub fn catalog(&self) -> CatalogState {
        lock::read(&self.inner.catalog).clone()
    }

    #[must_use]
    pub fn cart(&self) -> &CartState {
        &self.inner.cart
    }

    /// Throw away the catalog slice (and any cached lists) and load it again.
    #[instrument(skip(self))]
    pub async fn reload_catalog(&self) {
        if let Some(http) = &self.inner.http {
            http.invalidate_catalog().await;
        }
        let catalog = CatalogState::new(Arc::clone(&self.inner.api));
        catalog.activate().await;
        *lock::write(&self.inner.catalog) = catalog;
    }

    /// Log in, then refresh the cart.
    ///
    /// # Errors
    ///
    /// Returns the login failure. A failed cart refresh is recorded in the
    /// cart slice, not returned.
    pub async fn login(&self, email: &str, password: SecretString) -> Result<()> {
        self.inner.auth.login(email, password).await?;
        if let Err(e) = self.inner.cart.fetch_cart().await {
            warn!(error = %e, "Cart refresh after login failed");
        }
        Ok(())
    }

    /// Log in from the login page: refresh the cart, replay the pending add
    /// (at most once, since the redirect is consumed), and report where to go.
    ///
    /// # Errors
    ///
    /// Returns the login failure; the redirect is dropped with it.
    #[instrument(skip(self, password, redirect))]
    pub async fn login_with_redirect(
        &self,
        email: &str,
        password: SecretString,
        redirect: LoginRedirect,
    ) -> Result<LoginOutcome> {
        self.login(email, password).await?;

        let (redirect, intent) = redirect.into_parts();
        let replayed = match intent {
            Some(intent) => {
                info!(product_id = %intent.product_id, quantity = intent.quantity, "Replaying add to cart");
                Some(
                    self.inner
                        .cart
                        .add_to_cart(intent.product_id, intent.quantity)
                        .await,
                )
            }
            None => None,
        };

        Ok(LoginOutcome { redirect, replayed })
    }

    /// Log out. Synchronous; the cart is reset through the auth hook.
    pub fn logout(&self) {
        self.inner.auth.logout();
    }

    /// Add to the cart, or, when logged out, send nothing and return the
    /// login redirect that will replay the add. `return_to` is where the user
    /// lands after logging in.
    ///
    /// # Errors
    ///
    /// Returns the cart state's error for the add.
    pub async fn add_to_cart(
        &self,
        product_id: ProductId,
        quantity: u32,
        return_to: &str,
    ) -> Result<AddToCartOutcome> {
        match self.inner.cart.add_to_cart(product_id, quantity).await {
            Ok(()) => Ok(AddToCartOutcome::Added),
            Err(StoreError::Auth(AuthError::LoginRequired | AuthError::SessionExpired)) => {
                Ok(AddToCartOutcome::LoginRequired(LoginRedirect::for_add_to_cart(
                    return_to, product_id, quantity,
                )))
            }
            Err(e) => Err(e),
        }
    }

    /// A fresh catalog view controller.
    #[must_use]
    pub fn catalog_view(&self) -> CatalogView {
        CatalogView::new(self.inner.settings)
    }

    /// A fresh cart view controller.
    #[must_use]
    pub fn cart_view(&self) -> CartView {
        CartView::new(self.inner.cart.clone(), self.inner.settings)
    }

    /// A featured carousel over the current catalog.
    #[must_use]
    pub fn featured(&self, strategy: GrowthStrategy) -> FeaturedCarousel {
        FeaturedCarousel::new(self.catalog().products(), strategy)
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("settings", &self.inner.settings)
            .field("auth", &self.inner.auth)
            .field("cart", &self.inner.cart)
            .finish_non_exhaustive()
    }
}
