//! Flash-sale ticket inventory and order lifecycle service.
//!
//! The [`engine`] reserves stock and resolves orders against the
//! [`store`] traits; [`routes`] exposes it over HTTP.

pub mod clock;
pub mod config;
pub mod engine;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;
