//! Cartwheel Storefront library.
//!
//! The JSON API behind the storefront: catalog browsing, cart, wishlist,
//! checkout and accounts. Exposed as a library so the binary stays thin and
//! the router can be tested in-process.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
