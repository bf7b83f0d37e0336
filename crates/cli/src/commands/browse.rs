//! Interactive catalog: debounced search, category filter, paging and
//! back navigation over the catalog URL history.

use bazaar_client::error::messages;
use bazaar_client::views::{CatalogView, CategoryFilter, affordance};
use bazaar_client::{AddToCartOutcome, Storefront};
use bazaar_core::ProductId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use super::CliError;
use crate::render;

const HELP: &str = "\
type <text>        search as you type (applied after a pause)
search <text>      search now
category <id|all>  filter by category
more               show the next page
back               go back to the previous catalog URL
open <url>         go to a catalog URL, e.g. /?search=tea&category=2
add <id> [qty]     add a product to the cart
reload             reload the catalog
show               show the current page
quit";

/// Catalog URLs visited, newest last.
#[derive(Debug)]
struct History {
    entries: Vec<String>,
}

impl History {
    fn new(start: String) -> Self {
        Self {
            entries: vec![start],
        }
    }

    fn current(&self) -> &str {
        self.entries.last().map_or("/", String::as_str)
    }

    fn push(&mut self, path: String) {
        if self.current() != path {
            self.entries.push(path);
        }
    }

    /// Drop the current entry and return the one before it.
    fn back(&mut self) -> Option<&str> {
        if self.entries.len() < 2 {
            return None;
        }
        self.entries.pop();
        self.entries.last().map(String::as_str)
    }
}

pub async fn run(storefront: &Storefront) -> Result<(), CliError> {
    let mut view = storefront.catalog_view();
    let mut history = History::new(view.query().to_path());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    render::emit(HELP);
    show(storefront, &view);

    loop {
        // A search may have settled while a command was running
        if let Some(path) = view.apply_settled_search() {
            history.push(path);
            show(storefront, &view);
        }

        tokio::select! {
            Some(path) = view.settle_search(), if view.search_pending() => {
                history.push(path);
                show(storefront, &view);
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if !handle(storefront, &mut view, &mut history, line.trim()).await {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Run one REPL command. Returns false to quit.
async fn handle(
    storefront: &Storefront,
    view: &mut CatalogView,
    history: &mut History,
    line: &str,
) -> bool {
    let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
    debug!(command, arg, "Browse command");

    match command {
        "" => {}
        "quit" | "exit" => return false,
        "type" => view.type_search(arg),
        "search" => {
            history.push(view.set_search(arg));
            show(storefront, view);
        }
        "category" => {
            history.push(view.set_category(CategoryFilter::from_param(Some(arg))));
            show(storefront, view);
        }
        "more" => {
            if view.load_more(&storefront.catalog().products()) {
                show(storefront, view);
            } else {
                render::emit("No more products");
            }
        }
        "back" => match history.back() {
            Some(previous) => {
                view.apply_url(previous);
                show(storefront, view);
            }
            None => render::emit("Nothing to go back to"),
        },
        "open" => {
            view.apply_url(arg);
            history.push(view.query().to_path());
            show(storefront, view);
        }
        "add" => add(storefront, history.current(), arg).await,
        "reload" => {
            storefront.reload_catalog().await;
            show(storefront, view);
        }
        "show" => show(storefront, view),
        _ => render::emit(HELP),
    }
    true
}

async fn add(storefront: &Storefront, return_to: &str, arg: &str) {
    let mut parts = arg.split_whitespace();
    let Some(product_id) = parts.next().and_then(|id| id.parse::<ProductId>().ok()) else {
        render::emit("Usage: add <id> [qty]");
        return;
    };
    let quantity = parts.next().and_then(|q| q.parse().ok()).unwrap_or(1);

    match storefront.add_to_cart(product_id, quantity, return_to).await {
        Ok(AddToCartOutcome::Added) => render::emit("Added to cart"),
        Ok(AddToCartOutcome::LoginRequired(redirect)) => render::emit(&format!(
            "Log in to add to your cart: bz login -e <email> --resume '{}'",
            redirect.to_path()
        )),
        Err(e) => render::emit(&e.user_message(messages::ADD_FAILED)),
    }
}

fn show(storefront: &Storefront, view: &CatalogView) {
    let catalog = storefront.catalog();
    let products = catalog.products();
    let cart = storefront.cart().cart();
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
