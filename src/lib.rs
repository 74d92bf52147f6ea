//! # osu! API proxy
//!
//! Backend for the front-end application: obtains an OAuth2
//! client-credentials token for the osu! API, persists it in an env file,
//! refreshes it when it is missing or rejected, and relays user and score
//! queries with it.
//!
//! Modules:
//! - `config` — service configuration, loading and validation
//! - `credential` — the bearer credential and its persistent store
//! - `sources` — token exchange and authenticated upstream calls
//! - `manager` — token lifecycle (acquire, validate, authorized call)
//! - `server` — axum router and handlers

pub mod config;
pub mod credential;
pub mod error;
pub mod manager;
pub mod observability;
pub mod resilience;
pub mod server;
pub mod sources;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::config::settings::ServiceConfig;
pub use crate::error::ProxyError;
pub use crate::manager::{TokenManager, ValidationOutcome};
