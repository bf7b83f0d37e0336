//! Bazaar CLI - browse the catalog and manage the cart from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # List products, filtered like the catalog page
//! bz products --search tea --category 2 --pages 2
//!
//! # Log in (password from BAZAAR_PASSWORD or prompted)
//! bz login -e user@example.com
//!
//! # Manage the cart by product id
//! bz cart add 7 -q 2
//! bz cart inc 7
//! bz cart show
//!
//! # Interactive catalog with debounced search and back navigation
//! bz browse
//! ```
//!
//! # Commands
//!
//! - `products`, `product`, `categories`, `featured` - catalog
//! - `signup`, `login`, `logout` - account
//! - `cart` - show and change the cart
//! - `browse` - interactive catalog

#![cfg_attr(not(test), forbid(unsafe_code))]

use bazaar_client::ClientConfig;
use clap::{Parser, Subcommand, ValueEnum};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod render;

#[derive(Parser)]
#[command(name = "bz")]
#[command(author, version, about = "Bazaar storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products {
        /// Only products whose name contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Only products in this category id
        #[arg(short, long)]
        category: Option<i64>,

        /// Number of catalog pages to show
        #[arg(short, long, default_value_t = 1)]
        pages: usize,
    },
    /// Show one product
    Product {
        /// Product id
        id: i64,
    },
    /// List categories
    Categories,
    /// Show the featured products carousel
    Featured {
        /// Advance the carousel this many slides
        #[arg(short, long, default_value_t = 0)]
        advance: usize,

        /// When the carousel loads more products
        #[arg(short, long, value_enum, default_value_t = Strategy::SlideEnd)]
        strategy: Strategy,
    },
    /// Create an account
    Signup {
        #[arg(short, long)]
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,
    },
    /// Log in, optionally finishing an interrupted add-to-cart
    Login {
        #[arg(short, long)]
        email: String,

        /// Login page URL to resume, e.g. `/login?redirect=%2F&productId=3&quantity=1`
        #[arg(long, conflicts_with = "product")]
        resume: Option<String>,

        /// Product to add once logged in
        #[arg(long)]
        product: Option<i64>,

        /// Quantity to add once logged in
        #[arg(long, default_value_t = 1, requires = "product")]
        quantity: u32,
    },
    /// Log out
    Logout,
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Browse the catalog interactively
    Browse,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        /// Product id
        product: i64,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a product in the cart (0 removes it)
    Update {
        /// Product id
        product: i64,

        quantity: u32,
    },
    /// Remove a product from the cart
    Remove {
        /// Product id
        product: i64,
    },
    /// Add one more of a product in the cart
    Inc {
        /// Product id
        product: i64,
    },
    /// Remove one of a product in the cart
    Dec {
        /// Product id
        product: i64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    /// Load the next batch on reaching the last slide
    SlideEnd,
    /// Load the next batch on entering the last batch
    Prefetch,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = ClientConfig::from_env();

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bazaar_client=info,bazaar_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let storefront = commands::connect(&config).await;

    match cli.command {
        Commands::Products {
            search,
            category,
            pages,
        } => commands::catalog::products(&storefront, search.as_deref(), category, pages),
        Commands::Product { id } => commands::catalog::product(&storefront, id),
        Commands::Categories => commands::catalog::categories(&storefront),
        Commands::Featured { advance, strategy } => {
            let strategy = match strategy {
                Strategy::SlideEnd => bazaar_client::views::GrowthStrategy::AppendOnSlideEnd,
                Strategy::Prefetch => bazaar_client::views::GrowthStrategy::BatchPrefetch,
            };
            commands::catalog::featured(&storefront, advance, strategy);
        }
        Commands::Signup {
            email,
            first_name,
            last_name,
        } => commands::account::signup(&storefront, email, first_name, last_name).await?,
        Commands::Login {
            email,
            resume,
            product,
            quantity,
        } => commands::account::login(&storefront, &email, resume, product, quantity).await?,
        Commands::Logout => commands::account::logout(&storefront),
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&storefront),
            CartAction::Add { product, quantity } => {
                commands::cart::add(&storefront, product, quantity).await?;
            }
            CartAction::Update { product, quantity } => {
                commands::cart::update(&storefront, product, quantity).await?;
            }
            CartAction::Remove { product } => commands::cart::remove(&storefront, product).await?,
            CartAction::Inc { product } => commands::cart::increment(&storefront, product).await?,
            CartAction::Dec { product } => commands::cart::decrement(&storefront, product).await?,
        },
        Commands::Browse => commands::browse::run(&storefront).await?,
    }
    Ok(())
}
