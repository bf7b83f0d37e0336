//! Featured products carousel.
//!
//! Starts with the first batch of the catalog and grows by one batch at a
//! time. Slides are never evicted.

use std::sync::Arc;

use bazaar_core::Product;
use tracing::debug;

/// Products added per growth step.
pub const BATCH_SIZE: usize = 5;

/// When the window grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GrowthStrategy {
    /// Grow once the last loaded slide is shown.
    #[default]
    AppendOnSlideEnd,
    /// Grow as soon as the last loaded batch is entered, so the next batch is
    /// ready before the end is reached.
    BatchPrefetch,
}

/// Rolling window over the featured products.
#[derive(Debug, Clone)]
pub struct FeaturedCarousel {
    products: Arc<[Product]>,
    strategy: GrowthStrategy,
    loaded: usize,
    position: usize,
}

impl FeaturedCarousel {
    #[must_use]
    pub fn new(products: Arc<[Product]>, strategy: GrowthStrategy) -> Self {
        let loaded = products.len().min(BATCH_SIZE);
        Self {
            products,
            strategy,
            loaded,
            position: 0,
        }
    }

    /// Start over with a new product list.
    pub fn reset(&mut self, products: Arc<[Product]>) {
        *self = Self::new(products, self.strategy);
    }

    /// Slides currently loaded.
    #[must_use]
    pub fn window(&self) -> &[Product] {
        self.products.get(..self.loaded).unwrap_or_default()
    }

    /// Index of the slide being shown.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// The slide being shown.
    #[must_use]
    pub fn current(&self) -> Option<&Product> {
        self.window().get(self.position)
    }

    /// Whether products remain beyond the window.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.loaded < self.products.len()
    }

    /// The carousel moved to slide `index`. Returns whether the window grew.
    pub fn on_slide_change(&mut self, index: usize) -> bool {
        if self.loaded == 0 {
            return false;
        }
        self.position = index.min(self.loaded - 1);

        let trigger = match self.strategy {
            GrowthStrategy::AppendOnSlideEnd => self.loaded - 1,
            GrowthStrategy::BatchPrefetch => self.loaded.saturating_sub(BATCH_SIZE),
        };
        if self.position < trigger || !self.has_more() {
            return false;
        }

        self.loaded = (self.loaded + BATCH_SIZE).min(self.products.len());
        debug!(loaded = self.loaded, "Featured carousel grew");
        true
    }

    /// Move to the next slide, stopping at the last loaded one. Returns
    /// whether the window grew.
    pub fn advance(&mut self) -> bool {
        let next = self.position.saturating_add(1);
        self.on_slide_change(next)
    }
}
