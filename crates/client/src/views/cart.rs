//! Cart view controller.
//!
//! Picks the affordance for each product card, tracks which cart lines have
//! an update or delete in flight, and turns button presses and typed
//! quantities into cart state calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use bazaar_core::{Cart, CartItem, CartItemId, Price, ProductId, Quantity};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::cart::{CartSnapshot, CartState};
use crate::config::ViewSettings;
use crate::debounce::Debouncer;
use crate::error::Result;
use crate::lock;
use crate::redirect::LoginRedirect;

const CART_PATH: &str = "/cart";

/// What a product card offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    /// Not in the cart: an "add to cart" button.
    Add,
    /// In the cart: quantity controls for this line.
    Quantity {
        item_id: CartItemId,
        quantity: Quantity,
    },
}

/// Choose the card affordance for `product_id`.
#[must_use]
pub fn affordance(cart: Option<&Cart>, product_id: ProductId) -> Affordance {
    cart.and_then(|cart| cart.item_for_product(product_id))
        .map_or(Affordance::Add, |item| Affordance::Quantity {
            item_id: item.id,
            quantity: item.quantity,
        })
}

/// Cart totals for the header and cart page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSummary {
    pub lines: usize,
    pub units: u64,
    /// Server-computed total.
    pub total: Price,
}

impl From<&Cart> for CartSummary {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart.line_count(),
            units: cart.unit_count(),
            total: cart.total_cost,
        }
    }
}

/// What the cart page shows, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartPage {
    Loading,
    Error(String),
    /// Logged out: link to login, returning to the cart.
    LoginRequired(LoginRedirect),
    Empty,
    Items {
        items: Vec<CartItem>,
        summary: CartSummary,
    },
}

impl CartPage {
    #[must_use]
    pub fn from_snapshot(snapshot: &CartSnapshot, logged_in: bool) -> Self {
        if snapshot.is_loading {
            return Self::Loading;
        }
        if let Some(error) = snapshot.error.as_ref().filter(|e| !e.is_empty()) {
            return Self::Error(error.clone());
        }
        if !logged_in {
            return Self::LoginRequired(LoginRedirect::to(CART_PATH));
        }
        match &snapshot.cart {
            Some(cart) if !cart.is_empty() => Self::Items {
                items: cart.cart_items.clone(),
                summary: CartSummary::from(cart),
            },
            _ => Self::Empty,
        }
    }
}

/// A typed quantity for one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityEdit {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Marks a line busy for as long as it lives.
struct BusyGuard {
    busy: Arc<Mutex<HashSet<CartItemId>>>,
    item_id: CartItemId,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        lock::lock(&self.busy).remove(&self.item_id);
    }
}

/// Cart actions with per-line loading state.
#[derive(Debug)]
pub struct CartView {
    cart: CartState,
    settings: ViewSettings,
    busy: Arc<Mutex<HashSet<CartItemId>>>,
    inputs: HashMap<CartItemId, Debouncer<QuantityEdit>>,
    edits_tx: UnboundedSender<QuantityEdit>,
    edits_rx: UnboundedReceiver<QuantityEdit>,
}

impl CartView {
    #[must_use]
    pub fn new(cart: CartState, settings: ViewSettings) -> Self {
        let (edits_tx, edits_rx) = mpsc::unbounded_channel();
        Self {
            cart,
            settings,
            busy: Arc::new(Mutex::new(HashSet::new())),
            inputs: HashMap::new(),
            edits_tx,
            edits_rx,
        }
    }

    /// The affordance for a product card given the current cart.
    #[must_use]
    pub fn affordance(&self, product_id: ProductId) -> Affordance {
        affordance(self.cart.cart().as_ref(), product_id)
    }

    #[must_use]
    pub fn summary(&self) -> Option<CartSummary> {
        self.cart.cart().as_ref().map(CartSummary::from)
    }

    #[must_use]
    pub fn page(&self, logged_in: bool) -> CartPage {
        CartPage::from_snapshot(&self.cart.snapshot(), logged_in)
    }

    /// Whether an update or delete is in flight for this line.
    #[must_use]
    pub fn is_busy(&self, item_id: CartItemId) -> bool {
        lock::lock(&self.busy).contains(&item_id)
    }

    /// One more unit.
    ///
    /// # Errors
    ///
    /// Returns the cart state's error for the update.
    pub async fn increment(&self, item: &CartItem) -> Result<()> {
        self.set_quantity(item.id, item.product.id, item.quantity.incremented().get())
            .await
    }

    /// One fewer unit; from one, removes the line.
    ///
    /// # Errors
    ///
    /// Returns the cart state's error for the update or delete.
    pub async fn decrement(&self, item: &CartItem) -> Result<()> {
        let quantity = item.quantity.decremented().map_or(0, Quantity::get);
        self.set_quantity(item.id, item.product.id, quantity).await
    }

    /// Set a line's quantity; 0 removes it. Ignored while the line is busy.
    ///
    /// # Errors
    ///
    /// Returns the cart state's error for the update or delete.
    pub async fn set_quantity(
        &self,
        item_id: CartItemId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()> {
        let Some(_busy) = self.mark_busy(item_id) else {
            debug!(%item_id, "Line busy, ignoring quantity change");
            return Ok(());
        };
        self.cart
            .update_cart_item(item_id, product_id, quantity)
            .await
    }

    /// Remove a line. Ignored while the line is busy.
    ///
    /// # Errors
    ///
    /// Returns the cart state's error for the delete.
    pub async fn remove(&self, item_id: CartItemId) -> Result<()> {
        let Some(_busy) = self.mark_busy(item_id) else {
            debug!(%item_id, "Line busy, ignoring remove");
            return Ok(());
        };
        self.cart.delete_cart_item(item_id).await
    }

    /// Record text typed into a line's quantity box. A whole number of at
    /// least zero is applied once typing pauses; anything else is ignored.
    /// Returns whether the text was accepted.
    pub fn type_quantity(&mut self, item: &CartItem, text: &str) -> bool {
        let Some(edit) = parse_edit(item, text) else {
            return false;
        };
        let quiet = self.settings.quantity_debounce;
        let tx = self.edits_tx.clone();
        self.inputs
            .entry(item.id)
            .or_insert_with(|| Debouncer::with_sender(quiet, tx))
            .schedule(edit);
        true
    }

    /// Enter in a quantity box: apply the typed value without waiting.
    /// Returns whether the text was accepted.
    pub fn submit_quantity(&mut self, item: &CartItem, text: &str) -> bool {
        let Some(edit) = parse_edit(item, text) else {
            return false;
        };
        match self.inputs.get_mut(&item.id) {
            Some(input) => input.fire_now(edit),
            None => {
                let _ = self.edits_tx.send(edit);
            }
        }
        true
    }

    /// Whether any typed quantity is still waiting to settle.
    #[must_use]
    pub fn edits_pending(&self) -> bool {
        self.inputs.values().any(Debouncer::is_pending)
    }

    /// Wait for the next settled quantity edit.
    pub async fn next_edit(&mut self) -> Option<QuantityEdit> {
        self.edits_rx.recv().await
    }

    /// Apply a settled edit.
    ///
    /// # Errors
    ///
    /// Returns the cart state's error for the update or delete.
    pub async fn apply_edit(&self, edit: QuantityEdit) -> Result<()> {
        self.set_quantity(edit.item_id, edit.product_id, edit.quantity)
            .await
    }

    /// Apply every edit that has already settled, in arrival order.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first failure.
    pub async fn apply_settled_edits(&mut self) -> Result<usize> {
        let mut applied = 0;
        while let Ok(edit) = self.edits_rx.try_recv() {
            self.apply_edit(edit).await?;
            applied += 1;
        }
        Ok(applied)
    }

    fn mark_busy(&self, item_id: CartItemId) -> Option<BusyGuard> {
        lock::lock(&self.busy).insert(item_id).then(|| BusyGuard {
            busy: Arc::clone(&self.busy),
            item_id,
        })
    }
}

fn parse_edit(item: &CartItem, text: &str) -> Option<QuantityEdit> {
    let quantity = text.trim().parse::<u32>().ok()?;
    Some(QuantityEdit {
        item_id: item.id,
        product_id: item.product.id,
        quantity,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{CategoryId, Product};

    use super::*;

    fn item(id: i64, product_id: i64, quantity: u32) -> CartItem {
        CartItem {
            id: CartItemId::new(id),
            product: Product {
                id: ProductId::new(product_id),
                name: format!("Product {product_id}"),
                description: String::new(),
                price: Price::ZERO,
                image_url: String::new(),
                category_id: Some(CategoryId::new(1)),
            },
            quantity: Quantity::new(quantity).unwrap(),
        }
    }

    fn cart_with(items: Vec<CartItem>) -> Cart {
        Cart {
            cart_items: items,
            total_cost: Price::ZERO,
        }
    }

    #[test]
    fn test_affordance() {
        let cart = cart_with(vec![item(10, 1, 2)]);
        assert_eq!(
            affordance(Some(&cart), ProductId::new(1)),
            Affordance::Quantity {
                item_id: CartItemId::new(10),
                quantity: Quantity::new(2).unwrap()
            }
        );
        assert_eq!(affordance(Some(&cart), ProductId::new(2)), Affordance::Add);
        assert_eq!(affordance(None, ProductId::new(1)), Affordance::Add);
    }

    #[test]
    fn test_summary_uses_server_total() {
        let mut cart = cart_with(vec![item(1, 1, 2), item(2, 2, 3)]);
        cart.total_cost = Price::new(rust_decimal::Decimal::new(4200, 2)).unwrap();
        let summary = CartSummary::from(&cart);
        assert_eq!(summary.lines, 2);
        assert_eq!(summary.units, 5);
        assert_eq!(summary.total.display(), "42.00");
    }

    #[test]
    fn test_cart_page_priority() {
        let loading = CartSnapshot {
            cart: None,
            is_loading: true,
            error: Some("boom".to_string()),
        };
        assert_eq!(CartPage::from_snapshot(&loading, true), CartPage::Loading);

        let failed = CartSnapshot {
            error: Some("boom".to_string()),
            ..CartSnapshot::default()
        };
        assert_eq!(
            CartPage::from_snapshot(&failed, true),
            CartPage::Error("boom".to_string())
        );

        let logged_out = CartPage::from_snapshot(&CartSnapshot::default(), false);
        assert_eq!(
            logged_out,
            CartPage::LoginRequired(LoginRedirect::to("/cart"))
        );

        let empty = CartSnapshot {
            cart: Some(Cart::empty()),
            ..CartSnapshot::default()
        };
        assert_eq!(CartPage::from_snapshot(&empty, true), CartPage::Empty);
        assert_eq!(
            CartPage::from_snapshot(&CartSnapshot::default(), true),
            CartPage::Empty
        );
    }

    #[test]
    fn test_parse_edit() {
        let line = item(1, 5, 2);
        assert_eq!(parse_edit(&line, " 4 ").map(|e| e.quantity), Some(4));
        assert_eq!(parse_edit(&line, "0").map(|e| e.quantity), Some(0));
        assert!(parse_edit(&line, "").is_none());
        assert!(parse_edit(&line, "-1").is_none());
        assert!(parse_edit(&line, "two").is_none());
    }
}
