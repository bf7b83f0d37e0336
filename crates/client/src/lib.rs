//! Bazaar storefront client library.
//!
//! The state synchronization layer between a storefront front end and the
//! remote commerce API:
//!
//! - [`auth`] - login/logout/signup and the persisted access token
//! - [`catalog`] - product and category lists, fetched once
//! - [`cart`] - the cart, refreshed wholesale after every mutation
//! - [`views`] - catalog filtering/pagination, cart actions, featured carousel
//! - [`state`] - the [`Storefront`] application state wiring it all together
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_client::{ClientConfig, Storefront};
//!
//! let storefront = Storefront::new(&ClientConfig::from_env()?);
//! storefront.start().await;
//!
//! let products = storefront.catalog().products();
//! let mut view = storefront.catalog_view();
//! view.set_search("dates");
//! let page = view.page_view(&products);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod debounce;
pub mod error;
mod lock;
pub mod redirect;
pub mod session;
pub mod state;
pub mod views;

pub use config::ClientConfig;
pub use error::StoreError;
pub use state::{AddToCartOutcome, LoginOutcome, Storefront};
