//! Catalog models: products and categories.

use serde::{Deserialize, Serialize};

use crate::types::id::{CategoryId, ProductId};
use crate::types::price::Price;

/// A product as listed by `GET /product/`.
///
/// Products are created and destroyed server-side only; the client treats
/// them as immutable values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Stable product id.
    pub id: ProductId,
    /// Display name; the search filter matches against it.
    #[serde(default)]
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Unit price.
    pub price: Price,
    /// Image URL. Empty when the product has no image.
    #[serde(rename = "imageURL", default)]
    pub image_url: String,
    /// Owning category, if any.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

impl Product {
    /// Whether the product has an image to show instead of a placeholder.
    #[must_use]
    pub fn has_image(&self) -> bool {
        !self.image_url.trim().is_empty()
    }
}

/// A category as listed by `GET /category/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Category id, referenced by [`Product::category_id`].
    pub id: CategoryId,
    /// Display name.
    pub category_name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Image URL.
    #[serde(rename = "imageURL", default)]
    pub image_url: String,
    /// Products in this category. Often empty in list responses.
    #[serde(default)]
    pub products: Vec<Product>,
}
