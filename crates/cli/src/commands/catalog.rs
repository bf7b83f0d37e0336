//! Catalog commands: product list, product detail, categories, carousel.

use bazaar_client::Storefront;
use bazaar_client::views::{CategoryFilter, GrowthStrategy, affordance};
use bazaar_core::{CategoryId, ProductId};
use tracing::warn;

use crate::render;

/// List products the way the catalog page shows them: filtered, then the
/// first `pages` pages.
pub fn products(
    storefront: &Storefront,
    search: Option<&str>,
    category: Option<i64>,
    pages: usize,
) {
    let catalog = storefront.catalog();
    let products = catalog.products();
    let cart = storefront.cart().cart();

    let mut view = storefront.catalog_view();
    if let Some(search) = search {
        view.set_search(search);
    }
    if let Some(category) = category {
        view.set_category(CategoryFilter::Only(CategoryId::new(category)));
    }
    for _ in 1..pages {
        if !view.load_more(&products) {
            break;
        }
    }

    let page = view.page_view(&products);
    render::emit(&view.query().to_path());
    render::emit(&render::catalog_page(
        &page,
        catalog.error().as_deref(),
        |product| {
            render::product_line(
                product,
                catalog.category_of(product).as_ref(),
                affordance(cart.as_ref(), product.id),
            )
        },
    ));
}

/// Show one product. An unknown id renders with blank fields.
pub fn product(storefront: &Storefront, id: i64) {
    let catalog = storefront.catalog();
    if let Some(error) = catalog.error() {
        render::emit(&format!("Error: {error}"));
    }

    let product = match catalog.product(ProductId::new(id)) {
        Ok(product) => Some(product),
        Err(e) => {
            warn!(error = %e, "Product lookup failed");
            None
        }
    };
    let category = product.as_ref().and_then(|p| catalog.category_of(p));
    render::emit(&render::product_detail(product.as_ref(), category.as_ref()));

    if let Some(product) = &product {
        let cart = storefront.cart().cart();
        let line = render::product_line(
            product,
            None,
            affordance(cart.as_ref(), product.id),
        );
        render::emit(&line);
    }
}

pub fn categories(storefront: &Storefront) {
    let catalog = storefront.catalog();
    if let Some(error) = catalog.error() {
        render::emit(&format!("Error: {error}"));
    }
    render::emit(&render::categories(&catalog.categories()));
}

/// Show the featured carousel after advancing it `advance` slides.
pub fn featured(
    storefront: &Storefront,
    advance: usize,
    strategy: GrowthStrategy,
) {
    let mut carousel = storefront.featured(strategy);
    for _ in 0..advance {
        carousel.advance();
    }
    render::emit(&render::carousel(&carousel));
}
