//! Outbound calls to the osu! API: the client-credentials exchange and the
//! authenticated endpoints proxied on behalf of callers.

use std::time::Duration;

use anyhow::Result;
use reqwest::Client;

use crate::config::settings::UpstreamConfig;

pub mod oauth2;
pub mod upstream;

/// Shared HTTP client; every outbound call inherits the configured timeout.
pub fn build_client(upstream: &UpstreamConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_millis(upstream.timeout_ms))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
