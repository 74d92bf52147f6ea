use std::time::Instant;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::settings::CredentialsConfig;
use crate::credential::Credential;
use crate::error::ProxyError;
use crate::observability::metrics::get_metrics;
use crate::resilience::retry::RetrySettings;
use crate::utils::constants::GRANT_TYPE_CLIENT_CREDENTIALS;

static SUCCESS_MSG: &str = "success";
static ERROR_MSG: &str = "error";

/// Client-credentials exchange against the osu! token endpoint.
#[derive(Debug, Clone)]
pub struct OAuth2Source {
    pub token_url: String,
    pub credentials: CredentialsConfig,
    pub client: Client,
    pub retry: RetrySettings,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
    scope: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: Option<String>,
    expires_in: Option<u64>,
}

impl OAuth2Source {
    pub fn new(token_url: String, credentials: CredentialsConfig, client: Client, retry: RetrySettings) -> Self {
        Self {
            token_url,
            credentials,
            client,
            retry,
        }
    }

    pub async fn fetch_token(&self) -> Result<Credential, ProxyError> {
        let metrics = get_metrics().await;
        let start = Instant::now();

        let result = self
            .retry
            .run_with_retry(|| self.exchange_once(), ProxyError::is_retryable)
            .await;

        let outcome = if result.is_ok() { SUCCESS_MSG } else { ERROR_MSG };
        metrics.exchange_requests.with_label_values(&[outcome]).inc();
        metrics
            .exchange_duration
            .with_label_values(&[outcome])
            .observe(start.elapsed().as_secs_f64());
        result
    }

    async fn exchange_once(&self) -> Result<Credential, ProxyError> {
        let body = TokenRequest {
            client_id: &self.credentials.client_id,
            client_secret: &self.credentials.client_secret,
            grant_type: GRANT_TYPE_CLIENT_CREDENTIALS,
            scope: &self.credentials.scope,
        };
        debug!("token exchange, url '{}'", self.token_url);

        let response = self
            .client
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("OAuth2 token request failed: {}", status);
            return Err(ProxyError::ExchangeRejected(status));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProxyError::ExchangeMalformed(e.to_string()))?;
        if token.access_token.is_empty() {
            return Err(ProxyError::ExchangeMalformed("empty access_token".to_string()));
        }

        info!(
            "token issued, type: {}, expires_in: {:?}s",
            token.token_type.as_deref().unwrap_or("Bearer"),
            token.expires_in
        );
        Ok(Credential::new(token.access_token))
    }
}
