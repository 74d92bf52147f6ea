//! Token lifecycle: obtain, persist, validate and refresh the bearer
//! credential used for every proxied osu! API call.
//!
//! The credential is never cached here. Each operation reads the store, so a
//! refresh done by one request is what the next request sees.

use reqwest::StatusCode;
use tracing::{info, warn};

use crate::config::settings::ServiceConfig;
use crate::credential::{Credential, CredentialStore, Store};
use crate::error::ProxyError;
use crate::observability::metrics::get_metrics;
use crate::resilience::retry::RetrySettings;
use crate::sources::build_client;
use crate::sources::oauth2::OAuth2Source;
use crate::sources::upstream::{ApiRequest, ScoreQuery, UpstreamClient, UpstreamResponse};

/// Result of a successful [`TokenManager::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// stored token accepted, store untouched
    Valid,
    /// no token was stored, a new one was acquired
    Acquired,
    /// stored token rejected, exactly one re-acquire succeeded
    Refreshed,
}

#[derive(Debug, Clone)]
pub struct TokenManager {
    store: Store,
    oauth2: OAuth2Source,
    upstream: UpstreamClient,
    auto_refresh: bool,
}

impl TokenManager {
    pub fn new(store: Store, oauth2: OAuth2Source, upstream: UpstreamClient, auto_refresh: bool) -> Self {
        Self {
            store,
            oauth2,
            upstream,
            auto_refresh,
        }
    }

    pub fn from_config(cfg: &ServiceConfig) -> anyhow::Result<Self> {
        let client = build_client(&cfg.upstream)?;
        let retry = RetrySettings::from(cfg.settings.retry.as_ref());
        let oauth2 = OAuth2Source::new(
            cfg.upstream.token_url.clone(),
            cfg.credentials.clone(),
            client.clone(),
            retry.clone(),
        );
        let upstream = UpstreamClient::new(cfg.upstream.api_base_url.clone(), client, retry);
        Ok(Self::new(
            Store::from_config(&cfg.store),
            oauth2,
            upstream,
            cfg.manager.auto_refresh,
        ))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    async fn current(&self) -> Result<Option<Credential>, ProxyError> {
        self.store.get().await.map_err(ProxyError::Store)
    }

    /// Exchange the application credentials for a new token and persist it.
    /// On failure the stored credential is left as it was.
    pub async fn acquire(&self) -> Result<Credential, ProxyError> {
        let credential = self.oauth2.fetch_token().await?;
        self.store.set(&credential).await.map_err(ProxyError::Store)?;
        info!("access token acquired and stored");
        Ok(credential)
    }

    /// Check the stored token against `/me`, acquiring when absent and
    /// re-acquiring once when rejected. A failed re-acquire is returned as an error.
    pub async fn validate(&self) -> Result<ValidationOutcome, ProxyError> {
        let metrics = get_metrics().await;

        let (credential, acquired) = match self.current().await? {
            Some(credential) => (credential, false),
            None => {
                info!("no access token stored, acquiring");
                metrics.token_refreshes.with_label_values(&["missing"]).inc();
                let acquired = self.acquire().await?;
                // re-read: a concurrent acquire may have replaced ours
                (self.current().await?.unwrap_or(acquired), true)
            }
        };

        let response = self.upstream.get(&ApiRequest::me(), &credential).await?;
        if response.status.is_success() {
            return Ok(if acquired {
                ValidationOutcome::Acquired
            } else {
                ValidationOutcome::Valid
            });
        }

        warn!("access token rejected by upstream ({}), re-acquiring", response.status);
        metrics.token_refreshes.with_label_values(&["rejected"]).inc();
        self.acquire().await?;
        Ok(ValidationOutcome::Refreshed)
    }

    /// Authenticated GET relayed verbatim.
    ///
    /// Without `auto_refresh` a missing token is reported as
    /// [`ProxyError::TokenUnavailable`] and nothing is sent upstream. With it,
    /// a missing token is acquired first and a 401 triggers one re-acquire and retry.
    pub async fn authorized_call(&self, request: &ApiRequest) -> Result<UpstreamResponse, ProxyError> {
        let metrics = get_metrics().await;

        let credential = match self.current().await? {
            Some(credential) => credential,
            None if self.auto_refresh => {
                metrics.token_refreshes.with_label_values(&["missing"]).inc();
                self.acquire().await?
            }
            None => return Err(ProxyError::TokenUnavailable),
        };

        let response = self.upstream.get(request, &credential).await?;
        if self.auto_refresh && response.status == StatusCode::UNAUTHORIZED {
            warn!("upstream '{}' rejected access token, re-acquiring", request.label);
            metrics.token_refreshes.with_label_values(&["rejected"]).inc();
            let fresh = self.acquire().await?;
            return self.upstream.get(request, &fresh).await;
        }
        Ok(response)
    }

    pub async fn user(&self, user_id: &str) -> Result<UpstreamResponse, ProxyError> {
        self.authorized_call(&ApiRequest::user(user_id)).await
    }

    pub async fn best_scores(&self, user_id: &str, query: &ScoreQuery) -> Result<UpstreamResponse, ProxyError> {
        self.authorized_call(&ApiRequest::best_scores(user_id, query)).await
    }
}
