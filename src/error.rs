//! Request-path failures of the proxy.
//!
//! [`ProxyError`] implements [`axum::response::IntoResponse`] so handlers can
//! return `Result<_, ProxyError>` and callers get `{"error": "..."}` payloads.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The token endpoint answered with a non-success status.
    #[error("Failed to authenticate")]
    ExchangeRejected(StatusCode),

    /// The token endpoint answered 200 but the body carried no usable token.
    #[error("Failed to authenticate: {0}")]
    ExchangeMalformed(String),

    /// No credential is stored and the manager is not allowed to acquire one.
    #[error("Access token not available")]
    TokenUnavailable,

    /// An upstream 5xx that survived the retry policy. Relayed, never shown to callers as an error.
    #[error("upstream answered {status}")]
    UpstreamStatus {
        status: StatusCode,
        body: serde_json::Value,
    },

    /// Connect, timeout or body-decoding failure talking to the osu! API.
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The configured API base cannot be turned into a request URL.
    #[error("invalid upstream url {0}")]
    InvalidUpstreamUrl(String),

    /// Reading or writing the credential store failed.
    #[error("credential store failure: {0:#}")]
    Store(anyhow::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ExchangeRejected(_) | Self::ExchangeMalformed(_) => StatusCode::BAD_GATEWAY,
            Self::TokenUnavailable => StatusCode::UNAUTHORIZED,
            Self::UpstreamStatus { status, .. } => *status,
            Self::Transport(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidUpstreamUrl(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Worth another attempt: transport trouble or a server-side failure upstream.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::ExchangeRejected(status) => status.is_server_error(),
            Self::UpstreamStatus { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let Self::UpstreamStatus { body, .. } = self {
            return (status, Json(body)).into_response();
        }

        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        } else {
            tracing::warn!(%status, error = %message, "request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}
