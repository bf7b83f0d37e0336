//! Bazaar Core - Shared types library.
//!
//! This crate provides the domain types used across all Bazaar components:
//! - `client` - State synchronization layer over the remote commerce API
//! - `cli` - Command-line front end (`bz`)
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no HTTP
//! clients, no clocks. Everything here mirrors the commerce API's JSON shapes
//! so the client can decode responses directly into validated types.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, emails, prices, quantities, catalog and cart models

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
