//! Cart commands. Lines are addressed by product id.

use bazaar_client::error::{AuthError, messages};
use bazaar_client::{AddToCartOutcome, StoreError, Storefront};
use bazaar_core::{CartItem, ProductId};

use super::{CliError, rejected};
use crate::render;

pub fn show(storefront: &Storefront) {
    let page = storefront
        .cart_view()
        .page(storefront.auth().is_logged_in());
    render::emit(&render::cart_page(&page));
}

pub async fn add(storefront: &Storefront, product: i64, quantity: u32) -> Result<(), CliError> {
    let outcome = storefront
        .add_to_cart(ProductId::new(product), quantity, "/cart")
        .await
        .map_err(rejected(messages::ADD_FAILED))?;

    match outcome {
        AddToCartOutcome::Added => show(storefront),
        AddToCartOutcome::LoginRequired(redirect) => render::emit(&format!(
            "Log in to add to your cart: bz login -e <email> --resume '{}'",
            redirect.to_path()
        )),
    }
    Ok(())
}

/// Set the quantity of a line; 0 removes it.
pub async fn update(storefront: &Storefront, product: i64, quantity: u32) -> Result<(), CliError> {
    let item = line(storefront, product)?;
    storefront
        .cart_view()
        .set_quantity(item.id, item.product.id, quantity)
        .await
        .map_err(rejected(messages::UPDATE_FAILED))?;
    show(storefront);
    Ok(())
}

pub async fn remove(storefront: &Storefront, product: i64) -> Result<(), CliError> {
    let item = line(storefront, product)?;
    storefront
        .cart_view()
        .remove(item.id)
        .await
        .map_err(rejected(messages::DELETE_FAILED))?;
    show(storefront);
    Ok(())
}

pub async fn increment(storefront: &Storefront, product: i64) -> Result<(), CliError> {
    let item = line(storefront, product)?;
    storefront
        .cart_view()
        .increment(&item)
        .await
        .map_err(rejected(messages::UPDATE_FAILED))?;
    show(storefront);
    Ok(())
}

/// One fewer; from one, the line is removed.
pub async fn decrement(storefront: &Storefront, product: i64) -> Result<(), CliError> {
    let item = line(storefront, product)?;
    storefront
        .cart_view()
        .decrement(&item)
        .await
        .map_err(rejected(messages::UPDATE_FAILED))?;
    show(storefront);
    Ok(())
}

fn line(storefront: &Storefront, product: i64) -> Result<CartItem, CliError> {
    if !storefront.auth().is_logged_in() {
        return Err(StoreError::from(AuthError::LoginRequired).into());
    }
    let product_id = ProductId::new(product);
    storefront
        .cart()
        .item_for_product(product_id)
        .ok_or(CliError::NotInCart(product_id))
}
