//! Cart models.
//!
//! The cart is always replaced wholesale by the server's latest response;
//! nothing here mutates it locally.

use serde::{Deserialize, Serialize};

use crate::types::catalog::Product;
use crate::types::id::{CartItemId, ProductId};
use crate::types::price::Price;
use crate::types::quantity::Quantity;

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Line id, unique within the cart. Update and delete address lines by it.
    pub id: CartItemId,
    /// The product on this line.
    pub product: Product,
    /// Units on this line (at least one).
    pub quantity: Quantity,
}

/// The authenticated user's cart as returned by `GET /cart/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Lines in server order. The order carries no meaning.
    #[serde(default)]
    pub cart_items: Vec<CartItem>,
    /// Server-computed total. Never recomputed client-side.
    pub total_cost: Price,
}

impl Cart {
    /// An empty cart with a zero total.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            cart_items: Vec::new(),
            total_cost: Price::ZERO,
        }
    }

    /// Find the line holding `product_id`, if any.
    #[must_use]
    pub fn item_for_product(&self, product_id: ProductId) -> Option<&CartItem> {
        self.cart_items
            .iter()
            .find(|item| item.product.id == product_id)
    }

    /// Find a line by its id.
    #[must_use]
    pub fn item(&self, item_id: CartItemId) -> Option<&CartItem> {
        self.cart_items.iter().find(|item| item.id == item_id)
    }

    /// Number of lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.cart_items.len()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u64 {
        self.cart_items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cart_items.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CART_JSON: &str = r#"{
        "cartItems": [
            {"id": 10, "quantity": 2, "product": {"id": 1, "name": "Tea", "description": "", "price": 5, "imageURL": "", "categoryId": 1}},
            {"id": 11, "quantity": 1, "product": {"id": 2, "name": "Coffee", "description": "", "price": 7.25, "imageURL": "", "categoryId": 1}}
        ],
        "totalCost": 17.25
    }"#;

    #[test]
    fn test_cart_decodes_and_keeps_server_total() {
        let cart: Cart = serde_json::from_str(CART_JSON).unwrap();
        assert_eq!(cart.line_count(), 2);
        assert_eq!(cart.unit_count(), 3);
        assert_eq!(cart.total_cost.display(), "17.25");
    }

    #[test]
    fn test_item_lookup() {
        let cart: Cart = serde_json::from_str(CART_JSON).unwrap();
        let line = cart.item_for_product(ProductId::new(2)).unwrap();
        assert_eq!(line.id, CartItemId::new(11));
        assert!(cart.item_for_product(ProductId::new(99)).is_none());
        assert_eq!(cart.item(CartItemId::new(10)).unwrap().quantity.get(), 2);
    }

    #[test]
    fn test_zero_quantity_line_is_rejected() {
        let json = r#"{"cartItems": [{"id": 1, "quantity": 0, "product": {"id": 1, "price": 1}}], "totalCost": 0}"#;
        assert!(serde_json::from_str::<Cart>(json).is_err());
    }

    #[test]
    fn test_empty_cart() {
        let cart = Cart::empty();
        assert!(cart.is_empty());
        assert_eq!(cart.unit_count(), 0);
    }
}
