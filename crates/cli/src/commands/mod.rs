//! CLI command implementations.

pub mod account;
pub mod browse;
pub mod cart;
pub mod catalog;

use std::io::{self, BufRead, Write};

use bazaar_client::{ClientConfig, StoreError, Storefront};
use bazaar_core::ProductId;
use secrecy::SecretString;
use thiserror::Error;

/// Errors specific to the command line front end.
#[derive(Debug, Error)]
pub enum CliError {
    /// The product is not in the cart.
    #[error("Product {0} is not in the cart")]
    NotInCart(ProductId),

    /// The storefront rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A user-facing failure message.
    #[error("{0}")]
    Rejected(String),

    /// Terminal input failed.
    #[error("Input error: {0}")]
    Io(#[from] io::Error),
}

/// Turn a storefront error into the message shown for `fallback`.
pub fn rejected(fallback: &'static str) -> impl FnOnce(StoreError) -> CliError {
    move |e| CliError::Rejected(e.user_message(fallback))
}

/// Build the application state and load the catalog and cart.
pub async fn connect(config: &ClientConfig) -> Storefront {
    let storefront = Storefront::new(config);
    storefront.start().await;
    storefront
}

/// Read a password from `BAZAAR_PASSWORD`, or prompt for it on stdin.
pub fn read_password(prompt: &str) -> Result<SecretString, CliError> {
    if let Ok(password) = std::env::var("BAZAAR_PASSWORD") {
        return Ok(SecretString::from(password));
    }

    let mut stderr = io::stderr();
    write!(stderr, "{prompt}: ")?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(SecretString::from(line.trim_end_matches(['\r', '\n']).to_string()))
}
