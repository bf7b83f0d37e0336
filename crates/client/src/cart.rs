//! Cart state: fetch, mutate-then-refetch, and reset on logout.
//!
//! The local cart is only ever replaced by a fresh `GET cart/`. Mutations
//! never patch it and their response bodies are ignored.
//!
//! Every fetch takes a generation number; a response is applied only if no
//! newer fetch (or reset) has been issued since it started.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use bazaar_core::{Cart, CartItem, CartItemId, ProductId, Quantity};
use tracing::{debug, instrument};

use crate::api::{AddCartItem, ApiError, CommerceApi, UpdateCartItem};
use crate::auth::{AuthEvent, AuthState};
use crate::error::{AuthError, Result, StoreError, add_breadcrumb, messages};
use crate::lock;
use crate::session::AccessToken;

/// Point-in-time view of the cart slice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartSnapshot {
    /// `None` while logged out, before the first fetch, or after a failed one.
    pub cart: Option<Cart>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Shared handle to the cart slice.
#[derive(Clone)]
pub struct CartState {
    inner: Arc<CartInner>,
}

struct CartInner {
    api: Arc<dyn CommerceApi>,
    auth: AuthState,
    cart: RwLock<Option<Cart>>,
    error: RwLock<Option<String>>,
    generation: AtomicU64,
    loading: Mutex<LoadingCount>,
}

/// Operations in flight, scoped to the epoch they started in. A reset starts
/// a new epoch, so operations from before it no longer count.
#[derive(Debug, Default)]
struct LoadingCount {
    epoch: u64,
    in_flight: usize,
}

struct LoadingGuard {
    inner: Arc<CartInner>,
    epoch: u64,
}

impl LoadingGuard {
    /// False once a reset has happened since the operation started.
    fn is_current(&self) -> bool {
        lock::lock(&self.inner.loading).epoch == self.epoch
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let mut loading = lock::lock(&self.inner.loading);
        if loading.epoch == self.epoch {
            loading.in_flight = loading.in_flight.saturating_sub(1);
        }
    }
}

impl CartInner {
    fn begin_loading(self: &Arc<Self>) -> LoadingGuard {
        let mut loading = lock::lock(&self.loading);
        loading.in_flight += 1;
        LoadingGuard {
            inner: Arc::clone(self),
            epoch: loading.epoch,
        }
    }

    fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        {
            let mut loading = lock::lock(&self.loading);
            loading.epoch += 1;
            loading.in_flight = 0;
        }
        *lock::write(&self.cart) = None;
        *lock::write(&self.error) = None;
    }

    fn set_error(&self, error: Option<String>) {
        *lock::write(&self.error) = error;
    }
}

impl CartState {
    /// Create the cart slice and subscribe it to auth changes.
    ///
    /// Logout resets the cart. Login invalidates any fetch still running for
    /// the previous session.
    #[must_use]
    pub fn new(api: Arc<dyn CommerceApi>, auth: AuthState) -> Self {
        let inner = Arc::new(CartInner {
            api,
            auth: auth.clone(),
            cart: RwLock::new(None),
            error: RwLock::new(None),
            generation: AtomicU64::new(0),
            loading: Mutex::new(LoadingCount::default()),
        });

        let weak: Weak<CartInner> = Arc::downgrade(&inner);
        auth.on_change(move |event| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            match event {
                AuthEvent::LoggedOut => inner.reset(),
                AuthEvent::LoggedIn => {
                    inner.generation.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        Self { inner }
    }

    /// Replace the local cart with the server's. No-op while logged out.
    ///
    /// Failures are stored in `error` (and the cart cleared) as well as
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Network` if the fetch failed.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self) -> Result<()> {
        let Some(token) = self.inner.auth.token() else {
            debug!("Not logged in, skipping cart fetch");
            return Ok(());
        };

        let _loading = self.inner.begin_loading();
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.set_error(None);

        let result = self.inner.api.get_cart(&token).await;

        if self.inner.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Discarding stale cart response");
            return Ok(());
        }

        match result {
            Ok(cart) => {
                debug!(lines = cart.line_count(), "Cart refreshed");
                *lock::write(&self.inner.cart) = Some(cart);
                Ok(())
            }
            Err(ApiError::Unauthorized) => {
                self.inner.auth.expire();
                Err(AuthError::SessionExpired.into())
            }
            Err(e) => {
                let err = StoreError::from(e);
                err.report("fetch_cart");
                self.inner
                    .set_error(Some(err.user_message(messages::LOAD_CART_FAILED)));
                *lock::write(&self.inner.cart) = None;
                Err(err)
            }
        }
    }

    /// Add `quantity` units of a product, then re-fetch.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::LoginRequired` without calling the API when logged
    /// out, `StoreError::Validation` for a zero quantity, otherwise the
    /// mutation's failure.
    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        let token = self.require_token()?;
        let item = AddCartItem {
            product_id,
            quantity: Quantity::new(quantity)?,
        };
        add_breadcrumb("cart", "Add to cart");

        let api = Arc::clone(&self.inner.api);
        self.mutate("add_to_cart", messages::ADD_FAILED, async move {
            api.add_cart_item(&token, &item).await
        })
        .await
    }

    /// Set a line's quantity, then re-fetch. A quantity of 0 deletes the line.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::LoginRequired` without calling the API when logged
    /// out, otherwise the mutation's failure.
    #[instrument(skip(self))]
    pub async fn update_cart_item(
        &self,
        item_id: CartItemId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()> {
        let Ok(quantity) = Quantity::new(quantity) else {
            return self.delete_cart_item(item_id).await;
        };
        let token = self.require_token()?;
        let update = UpdateCartItem {
            id: item_id,
            product_id,
            quantity,
        };

        let api = Arc::clone(&self.inner.api);
        self.mutate("update_cart_item", messages::UPDATE_FAILED, async move {
            api.update_cart_item(&token, item_id, &update).await
        })
        .await
    }

    /// Remove a line, then re-fetch.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::LoginRequired` without calling the API when logged
    /// out, otherwise the mutation's failure.
    #[instrument(skip(self))]
    pub async fn delete_cart_item(&self, item_id: CartItemId) -> Result<()> {
        let token = self.require_token()?;
        add_breadcrumb("cart", "Remove from cart");

        let api = Arc::clone(&self.inner.api);
        self.mutate("delete_cart_item", messages::DELETE_FAILED, async move {
            api.delete_cart_item(&token, item_id).await
        })
        .await
    }

    /// Clear the slice synchronously: no cart, no error, not loading.
    pub fn reset_cart(&self) {
        self.inner.reset();
    }

    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            cart: self.cart(),
            is_loading: self.is_loading(),
            error: self.error(),
        }
    }

    #[must_use]
    pub fn cart(&self) -> Option<Cart> {
        lock::read(&self.inner.cart).clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        lock::lock(&self.inner.loading).in_flight > 0
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        lock::read(&self.inner.error).clone()
    }

    /// The line holding `product_id`, if any.
    #[must_use]
    pub fn item_for_product(&self, product_id: ProductId) -> Option<CartItem> {
        lock::read(&self.inner.cart)
            .as_ref()
            .and_then(|cart| cart.item_for_product(product_id))
            .cloned()
    }

    fn require_token(&self) -> Result<AccessToken> {
        self.inner
            .auth
            .token()
            .ok_or(StoreError::Auth(AuthError::LoginRequired))
    }

    /// Loading on, error cleared, request, always re-fetch, then record the
    /// mutation's failure (after the re-fetch, so it is not wiped). A failure
    /// that outlives a logout is returned but not recorded.
    async fn mutate<F>(&self, operation: &'static str, fallback: &str, request: F) -> Result<()>
    where
        F: Future<Output = std::result::Result<(), ApiError>>,
    {
        let loading = self.inner.begin_loading();
        self.inner.set_error(None);

        let outcome = request.await.map_err(StoreError::from);
        if matches!(outcome, Err(ref err) if err.is_unauthorized()) {
            self.inner.auth.expire();
            return Err(AuthError::SessionExpired.into());
        }

        if let Err(e) = self.fetch_cart().await {
            debug!(error = %e, operation, "Re-fetch after mutation failed");
        }

        if let Err(err) = &outcome {
            err.report(operation);
            if loading.is_current() {
                self.inner.set_error(Some(err.user_message(fallback)));
            } else {
                debug!(operation, "Cart was reset during the mutation, dropping its error");
            }
        }
        outcome
    }
}

impl std::fmt::Debug for CartState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartState")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}
