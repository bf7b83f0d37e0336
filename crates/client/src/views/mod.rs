//! View controllers: state derived from the slices plus local UI selection.
//!
//! - [`catalog`] - search/category filter, pagination, infinite scroll, URL sync
//! - [`cart`] - card affordances, per-item busy tracking, quantity edits
//! - [`carousel`] - rolling window of featured products

pub mod carousel;
pub mod cart;
pub mod catalog;

pub use carousel::{FeaturedCarousel, GrowthStrategy};
pub use cart::{Affordance, CartPage, CartSummary, CartView, QuantityEdit, affordance};
pub use catalog::{CatalogQuery, CatalogView, CategoryFilter, PageView, ScrollMetrics, filter_products};
