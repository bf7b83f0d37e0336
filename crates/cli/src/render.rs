//! Plain-text rendering of storefront state.

use std::fmt::Write;

use bazaar_client::error::messages;
use bazaar_client::views::{Affordance, CartPage, FeaturedCarousel, PageView};
use bazaar_core::{Category, Product};

/// Write rendered output to stdout.
#[allow(clippy::print_stdout)]
pub fn emit(text: &str) {
    println!("{text}");
}

/// One catalog row: id, name, price, category, cart status.
pub fn product_line(
    product: &Product,
    category: Option<&Category>,
    affordance: Affordance,
) -> String {
    let mut line = format!(
        "#{:<5} {:<32} {:>10}",
        product.id, product.name, product.price
    );
    if let Some(category) = category {
        let _ = write!(line, "  [{}]", category.category_name);
    }
    if let Affordance::Quantity { quantity, .. } = affordance {
        let _ = write!(line, "  (in cart: {quantity})");
    }
    line
}

/// The visible catalog page, or the error/empty state.
pub fn catalog_page(
    page: &PageView<'_>,
    error: Option<&str>,
    line: impl Fn(&Product) -> String,
) -> String {
    if let Some(error) = error.filter(|e| !e.is_empty()) {
        return format!("Error: {error}");
    }
    if page.is_empty() {
        return messages::NO_MATCHES.to_string();
    }

    let mut out = String::new();
    for product in &page.visible {
        let _ = writeln!(out, "{}", line(product));
    }
    let _ = write!(
        out,
        "Showing {} of {} products",
        page.visible.len(),
        page.filtered_len
    );
    if page.has_more() {
        out.push_str(" (more available)");
    }
    out
}

/// Product detail. A missing product renders with blank fields.
pub fn product_detail(product: Option<&Product>, category: Option<&Category>) -> String {
    let field = |f: fn(&Product) -> String| product.map(f).unwrap_or_default();

    let mut out = String::new();
    let _ = writeln!(out, "Name:        {}", field(|p| p.name.clone()));
    let _ = writeln!(out, "Price:       {}", field(|p| p.price.display()));
    let _ = writeln!(
        out,
        "Category:    {}",
        category.map(|c| c.category_name.as_str()).unwrap_or_default()
    );
    let _ = writeln!(
        out,
        "Image:       {}",
        field(|p| if p.has_image() {
            p.image_url.clone()
        } else {
            "(no image)".to_string()
        })
    );
    let _ = write!(out, "Description: {}", field(|p| p.description.clone()));
    out
}

pub fn categories(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "No categories".to_string();
    }
    categories
        .iter()
        .map(|c| format!("#{:<5} {}", c.id, c.category_name))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn cart_page(page: &CartPage) -> String {
    match page {
        CartPage::Loading => "Loading cart...".to_string(),
        CartPage::Error(error) => format!("Error: {error}"),
        CartPage::LoginRequired(redirect) => {
            format!("Log in to see your cart ({})", redirect.to_path())
        }
        CartPage::Empty => messages::EMPTY_CART.to_string(),
        CartPage::Items { items, summary } => {
            let mut out = String::new();
            for item in items {
                let _ = writeln!(
                    out,
                    "#{:<5} {:<32} {:>10} x {}",
                    item.product.id, item.product.name, item.product.price, item.quantity
                );
            }
            let _ = write!(
                out,
                "{} lines, {} items, total {}",
                summary.lines, summary.units, summary.total
            );
            out
        }
    }
}

/// The loaded carousel slides with the current one marked.
pub fn carousel(carousel: &FeaturedCarousel) -> String {
    if carousel.window().is_empty() {
        return "No featured products".to_string();
    }

    let mut out = String::new();
    for (index, product) in carousel.window().iter().enumerate() {
        let marker = if index == carousel.position() { '>' } else { ' ' };
        let _ = writeln!(out, "{marker} {:>2}. {}", index + 1, product.name);
    }
    let _ = write!(
        out,
        "{} slides loaded{}",
        carousel.window().len(),
        if carousel.has_more() { ", more to come" } else { "" }
    );
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{CategoryId, Price, ProductId, Quantity};

    use super::*;

    fn product() -> Product {
        Product {
            id: ProductId::new(7),
            name: "Green tea".to_string(),
            description: "Loose leaf".to_string(),
            price: Price::new(rust_decimal::Decimal::new(1250, 2)).unwrap(),
            image_url: String::new(),
            category_id: Some(CategoryId::new(1)),
        }
    }

    #[test]
    fn test_product_line_shows_cart_quantity() {
        let line = product_line(
            &product(),
            None,
            Affordance::Quantity {
                item_id: bazaar_core::CartItemId::new(1),
                quantity: Quantity::ONE,
            },
        );
        assert!(line.starts_with("#7"));
        assert!(line.contains("12.50"));
        assert!(line.ends_with("(in cart: 1)"));
    }

    #[test]
    fn test_missing_product_renders_blank() {
        let detail = product_detail(None, None);
        assert!(detail.starts_with("Name:        \n"));
        assert!(detail.ends_with("Description: "));
    }

    #[test]
    fn test_catalog_error_wins() {
        let page = PageView {
            visible: Vec::new(),
            filtered_len: 0,
            page: 1,
        };
        assert_eq!(
            catalog_page(&page, Some("down"), |_| String::new()),
            "Error: down"
        );
        assert_eq!(
            catalog_page(&page, None, |_| String::new()),
            messages::NO_MATCHES
        );
    }
}
