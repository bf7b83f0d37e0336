//! Catalog state: the product and category lists.
//!
//! Both lists are fetched once, on first activation, and never refreshed.
//! Readers get cheap `Arc` snapshots.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use bazaar_core::{Category, Product, ProductId};
use tracing::{debug, instrument};

use crate::api::CommerceApi;
use crate::error::{Result, StoreError, messages};
use crate::lock;

/// Point-in-time view of the catalog slice.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub products: Arc<[Product]>,
    pub categories: Arc<[Category]>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Default for CatalogSnapshot {
    fn default() -> Self {
        Self {
            products: Arc::from(Vec::new()),
            categories: Arc::from(Vec::new()),
            is_loading: false,
            error: None,
        }
    }
}

/// Shared handle to the catalog slice.
#[derive(Clone)]
pub struct CatalogState {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    api: Arc<dyn CommerceApi>,
    activated: AtomicBool,
    snapshot: RwLock<CatalogSnapshot>,
}

impl CatalogState {
    #[must_use]
    pub fn new(api: Arc<dyn CommerceApi>) -> Self {
        Self {
            inner: Arc::new(CatalogInner {
                api,
                activated: AtomicBool::new(false),
                snapshot: RwLock::new(CatalogSnapshot::default()),
            }),
        }
    }

    /// Fetch products and categories. Only the first call does anything.
    ///
    /// A failed list is left empty and its message stored in `error`; when
    /// both fail the products message is the one kept.
    #[instrument(skip(self))]
    pub async fn activate(&self) {
        if self.inner.activated.swap(true, Ordering::SeqCst) {
            debug!("Catalog already activated");
            return;
        }

        {
            let mut snapshot = lock::write(&self.inner.snapshot);
            snapshot.is_loading = true;
            snapshot.error = None;
        }

        let (products, categories) = tokio::join!(
            self.inner.api.list_products(),
            self.inner.api.list_categories()
        );

        let mut errors = Vec::new();
        let products: Arc<[Product]> = products.map_or_else(
            |e| {
                let err = StoreError::from(e);
                err.report("list_products");
                errors.push(err.user_message(messages::LOAD_PRODUCTS_FAILED));
                Arc::from(Vec::new())
            },
            Arc::from,
        );
        let categories: Arc<[Category]> = categories.map_or_else(
            |e| {
                let err = StoreError::from(e);
                err.report("list_categories");
                errors.push(err.user_message(messages::LOAD_CATEGORIES_FAILED));
                Arc::from(Vec::new())
            },
            Arc::from,
        );

        debug!(
            products = products.len(),
            categories = categories.len(),
            "Catalog loaded"
        );

        *lock::write(&self.inner.snapshot) = CatalogSnapshot {
            products,
            categories,
            is_loading: false,
            error: errors.into_iter().next(),
        };
    }

    #[must_use]
    pub fn snapshot(&self) -> CatalogSnapshot {
        lock::read(&self.inner.snapshot).clone()
    }

    #[must_use]
    pub fn products(&self) -> Arc<[Product]> {
        Arc::clone(&lock::read(&self.inner.snapshot).products)
    }

    #[must_use]
    pub fn categories(&self) -> Arc<[Category]> {
        Arc::clone(&lock::read(&self.inner.snapshot).categories)
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        lock::read(&self.inner.snapshot).is_loading
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        lock::read(&self.inner.snapshot).error.clone()
    }

    /// Look up one product by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the catalog has no such product.
    pub fn product(&self, id: ProductId) -> Result<Product> {
        lock::read(&self.inner.snapshot)
            .products
            .iter()
            .find(|product| product.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))
    }

    /// The category a product belongs to, if it has one and it is listed.
    #[must_use]
    pub fn category_of(&self, product: &Product) -> Option<Category> {
        let category_id = product.category_id?;
        lock::read(&self.inner.snapshot)
            .categories
            .iter()
            .find(|category| category.id == category_id)
            .cloned()
    }
}

impl std::fmt::Debug for CatalogState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogState")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}
