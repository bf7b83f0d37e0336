//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts and the
//! catalog/cart models exchanged with the commerce API.

pub mod cart;
pub mod catalog;
pub mod email;
pub mod id;
pub mod price;
pub mod quantity;

pub use cart::{Cart, CartItem};
pub use catalog::{Category, Product};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use quantity::{Quantity, QuantityError};
