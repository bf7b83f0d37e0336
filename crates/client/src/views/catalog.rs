//! Catalog view controller.
//!
//! Derives the visible product list from the catalog snapshot and the local
//! selection (search text, category, page). The selection round-trips through
//! the `search` and `category` URL query parameters so back/forward restores
//! it.

use std::fmt;

use bazaar_core::{CategoryId, Product};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;
use url::form_urlencoded;

use crate::config::ViewSettings;
use crate::debounce::Debouncer;

const CATALOG_PATH: &str = "/";

/// Category selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(CategoryId),
}

impl CategoryFilter {
    /// Whether a product passes this filter.
    #[must_use]
    pub fn matches(self, product: &Product) -> bool {
        match self {
            Self::All => true,
            Self::Only(id) => product.category_id == Some(id),
        }
    }

    /// Read the `category` query parameter. Anything non-numeric is "all".
    #[must_use]
    pub fn from_param(param: Option<&str>) -> Self {
        param
            .and_then(|raw| raw.parse::<CategoryId>().ok())
            .map_or(Self::All, Self::Only)
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(id) => write!(f, "{id}"),
        }
    }
}

/// Case-insensitive substring match on the product name. A blank query
/// matches everything.
#[must_use]
pub fn matches_search(product: &Product, query: &str) -> bool {
    query.trim().is_empty() || product.name.to_lowercase().contains(&query.to_lowercase())
}

/// Products matching both the search text and the category, in catalog order.
pub fn filter_products<'a, I>(products: I, query: &str, category: CategoryFilter) -> Vec<&'a Product>
where
    I: IntoIterator<Item = &'a Product>,
{
    products
        .into_iter()
        .filter(|product| matches_search(product, query) && category.matches(product))
        .collect()
}

/// The catalog selection as carried in the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub search: String,
    pub category: CategoryFilter,
}

impl CatalogQuery {
    /// Read a catalog URL (or just its query string). Absent parameters mean
    /// no search and all categories.
    #[must_use]
    pub fn parse(url: &str) -> Self {
        let query = url.split_once('?').map_or("", |(_, query)| query);

        let mut search = String::new();
        let mut category = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "search" => search = value.into_owned(),
                "category" => category = Some(value.into_owned()),
                _ => {}
            }
        }

        Self {
            search,
            category: CategoryFilter::from_param(category.as_deref()),
        }
    }

    /// The catalog URL for this selection, e.g. `/?search=tea&category=2`.
    #[must_use]
    pub fn to_path(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if !self.search.is_empty() {
            query.append_pair("search", &self.search);
        }
        if let CategoryFilter::Only(id) = self.category {
            query.append_pair("category", &id.to_string());
        }

        let query = query.finish();
        if query.is_empty() {
            CATALOG_PATH.to_string()
        } else {
            format!("{CATALOG_PATH}?{query}")
        }
    }
}

/// Scroll position reported by the front end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub viewport_height: f64,
    pub scroll_y: f64,
    pub document_height: f64,
}

impl ScrollMetrics {
    /// Whether the bottom of the viewport is within `threshold` pixels of the
    /// end of the document.
    #[must_use]
    pub fn near_bottom(&self, threshold: f64) -> bool {
        self.viewport_height + self.scroll_y >= self.document_height - threshold
    }
}

/// The slice of the filtered catalog currently shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView<'a> {
    pub visible: Vec<&'a Product>,
    pub filtered_len: usize,
    pub page: usize,
}

impl PageView<'_> {
    /// More filtered products exist beyond the visible ones.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.visible.len() < self.filtered_len
    }

    /// Nothing matches the current selection.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.filtered_len == 0
    }
}

/// Catalog view state for one page of the front end.
#[derive(Debug)]
pub struct CatalogView {
    settings: ViewSettings,
    query: CatalogQuery,
    page: usize,
    search_input: Debouncer<String>,
    settled_searches: UnboundedReceiver<String>,
}

impl CatalogView {
    /// Create a view on page 1 with no search and all categories.
    #[must_use]
    pub fn new(settings: ViewSettings) -> Self {
        let (search_input, settled_searches) = Debouncer::new(settings.search_debounce);
        Self {
            settings,
            query: CatalogQuery::default(),
            page: 1,
            search_input,
            settled_searches,
        }
    }

    #[must_use]
    pub const fn query(&self) -> &CatalogQuery {
        &self.query
    }

    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    /// Apply search text now. Resets to page 1 and returns the URL to push.
    pub fn set_search(&mut self, search: &str) -> String {
        self.query.search = search.to_string();
        self.page = 1;
        debug!(search, "Search applied");
        self.query.to_path()
    }

    /// Apply a category now. Resets to page 1 and returns the URL to push.
    pub fn set_category(&mut self, category: CategoryFilter) -> String {
        self.query.category = category;
        self.page = 1;
        debug!(%category, "Category applied");
        self.query.to_path()
    }

    /// Record a keystroke in the search box. The text is applied once input
    /// has been quiet for the debounce period.
    pub fn type_search(&mut self, text: &str) {
        self.search_input.schedule(text.to_string());
    }

    /// Whether typed search text is still waiting to settle.
    #[must_use]
    pub fn search_pending(&self) -> bool {
        self.search_input.is_pending()
    }

    /// Wait for typed search text to settle, apply it, and return the URL to
    /// push.
    pub async fn settle_search(&mut self) -> Option<String> {
        let search = self.settled_searches.recv().await?;
        Some(self.set_search(&search))
    }

    /// Apply search text that has already settled, if any, without waiting.
    pub fn apply_settled_search(&mut self) -> Option<String> {
        let mut latest = None;
        while let Ok(search) = self.settled_searches.try_recv() {
            latest = Some(search);
        }
        latest.map(|search| self.set_search(&search))
    }

    /// Adopt the selection from a URL the user navigated to. Returns whether
    /// anything changed; a change resets to page 1.
    pub fn apply_url(&mut self, url: &str) -> bool {
        let query = CatalogQuery::parse(url);
        if query == self.query {
            return false;
        }
        self.search_input.cancel();
        self.query = query;
        self.page = 1;
        true
    }

    /// The filtered products and the first `page × items_per_page` of them.
    #[must_use]
    pub fn page_view<'a>(&self, products: &'a [Product]) -> PageView<'a> {
        let filtered = filter_products(products, &self.query.search, self.query.category);
        let filtered_len = filtered.len();
        let visible = filtered
            .into_iter()
            .take(self.page.saturating_mul(self.settings.items_per_page))
            .collect();

        PageView {
            visible,
            filtered_len,
            page: self.page,
        }
    }

    /// Show the next page if more filtered products exist. Returns whether the
    /// page advanced.
    pub fn load_more(&mut self, products: &[Product]) -> bool {
        if !self.page_view(products).has_more() {
            return false;
        }
        self.page += 1;
        debug!(page = self.page, "Loaded next catalog page");
        true
    }

    /// Infinite scroll: load the next page when near the bottom.
    pub fn on_scroll(&mut self, products: &[Product], metrics: ScrollMetrics) -> bool {
        metrics.near_bottom(self.settings.scroll_threshold_px) && self.load_more(products)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use bazaar_core::{Price, ProductId};

    use super::*;

    fn product(id: i64, name: &str, category: Option<i64>) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            description: String::new(),
            price: Price::ZERO,
            image_url: String::new(),
            category_id: category.map(CategoryId::new),
        }
    }

    fn two_products() -> Vec<Product> {
        vec![
            product(1, "Test Product 1", Some(1)),
            product(2, "Test Product 2", Some(2)),
        ]
    }

    fn ids(products: &[&Product]) -> Vec<i64> {
        products.iter().map(|p| p.id.as_i64()).collect()
    }

    fn many(count: i64) -> Vec<Product> {
        (1..=count)
            .map(|i| product(i, &format!("Item {i}"), None))
            .collect()
    }

    #[test]
    fn test_search_filters_by_name() {
        let products = two_products();
        let filtered = filter_products(&products, "Test Product 1", CategoryFilter::All);
        assert_eq!(ids(&filtered), vec![1]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let products = two_products();
        let filtered = filter_products(&products, "test PRODUCT 2", CategoryFilter::All);
        assert_eq!(ids(&filtered), vec![2]);
    }

    #[test]
    fn test_blank_search_matches_all() {
        let products = two_products();
        assert_eq!(filter_products(&products, "", CategoryFilter::All).len(), 2);
        assert_eq!(filter_products(&products, "   ", CategoryFilter::All).len(), 2);
    }

    #[test]
    fn test_category_filter() {
        let products = two_products();
        let filtered = filter_products(&products, "", CategoryFilter::Only(CategoryId::new(1)));
        assert_eq!(ids(&filtered), vec![1]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let products = vec![
            product(1, "Green tea", Some(1)),
            product(2, "Black tea", Some(1)),
            product(3, "Coffee", Some(2)),
            product(4, "Tea cups", None),
        ];
        let category = CategoryFilter::Only(CategoryId::new(1));
        let once = filter_products(&products, "tea", category);
        let twice = filter_products(once.iter().copied(), "tea", category);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_all_categories_only_applies_search() {
        let products = vec![
            product(1, "Green tea", Some(1)),
            product(2, "Coffee", Some(2)),
            product(3, "Tea cups", None),
        ];
        let with_all = filter_products(&products, "tea", CategoryFilter::All);
        let search_only: Vec<&Product> =
            products.iter().filter(|p| matches_search(p, "tea")).collect();
        assert_eq!(with_all, search_only);
    }

    #[test]
    fn test_uncategorized_products_excluded_by_category() {
        let products = vec![product(1, "Loose", None)];
        assert!(filter_products(&products, "", CategoryFilter::Only(CategoryId::new(1))).is_empty());
    }

    #[test]
    fn test_pagination_and_load_more() {
        let products = many(10);
        let mut view = CatalogView::new(ViewSettings::default());

        let page = view.page_view(&products);
        assert_eq!(page.visible.len(), 8);
        assert!(page.has_more());

        assert!(view.load_more(&products));
        assert_eq!(view.page_view(&products).visible.len(), 10);

        assert!(!view.load_more(&products));
        assert_eq!(view.page(), 2);
        assert_eq!(view.page_view(&products).visible.len(), 10);
    }

    #[test]
    fn test_changing_selection_resets_page() {
        let products = many(20);
        let mut view = CatalogView::new(ViewSettings::default());
        assert!(view.load_more(&products));
        assert_eq!(view.page(), 2);

        view.set_search("Item");
        assert_eq!(view.page(), 1);

        assert!(view.load_more(&products));
        view.set_category(CategoryFilter::All);
        assert_eq!(view.page(), 1);
    }

    #[test]
    fn test_scroll_threshold() {
        let products = many(10);
        let mut view = CatalogView::new(ViewSettings::default());

        let far = ScrollMetrics {
            viewport_height: 800.0,
            scroll_y: 0.0,
            document_height: 3000.0,
        };
        assert!(!view.on_scroll(&products, far));

        let near = ScrollMetrics {
            viewport_height: 800.0,
            scroll_y: 1200.0,
            document_height: 3000.0,
        };
        assert!(view.on_scroll(&products, near));
        assert!(!view.on_scroll(&products, near));
        assert_eq!(view.page(), 2);
    }

    #[test]
    fn test_query_paths() {
        assert_eq!(CatalogQuery::default().to_path(), "/");

        let query = CatalogQuery {
            search: "green tea".to_string(),
            category: CategoryFilter::Only(CategoryId::new(2)),
        };
        assert_eq!(query.to_path(), "/?search=green+tea&category=2");
        assert_eq!(CatalogQuery::parse(&query.to_path()), query);
    }

    #[test]
    fn test_query_parse_tolerates_bad_category() {
        let query = CatalogQuery::parse("/?category=all&search=x");
        assert_eq!(query.category, CategoryFilter::All);
        assert_eq!(query.search, "x");
    }

    #[test]
    fn test_apply_url_restores_selection() {
        let products = many(20);
        let mut view = CatalogView::new(ViewSettings::default());
        let first = view.set_search("Item 1");
        view.set_category(CategoryFilter::Only(CategoryId::new(3)));
        view.load_more(&products);

        // Back to the earlier URL
        assert!(view.apply_url(&first));
        assert_eq!(view.query().search, "Item 1");
        assert_eq!(view.query().category, CategoryFilter::All);
        assert_eq!(view.page(), 1);

        assert!(!view.apply_url(&first));
        assert!(view.apply_url("/"));
        assert_eq!(view.query(), &CatalogQuery::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_debounced() {
        let mut view = CatalogView::new(ViewSettings::default());
        view.type_search("t");
        view.type_search("te");
        view.type_search("tea");
        assert!(view.search_pending());
        assert_eq!(view.apply_settled_search(), None);
        assert_eq!(view.query().search, "");

        tokio::time::sleep(Duration::from_millis(301)).await;
        let path = view.settle_search().await.unwrap();
        assert_eq!(path, "/?search=tea");
        assert_eq!(view.query().search, "tea");
    }
}
