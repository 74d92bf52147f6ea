// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Json;
use reqwest::Client;
use serde_json::Value;

use crate::config::settings::CredentialsConfig;
use crate::credential::Store;
use crate::manager::TokenManager;
use crate::resilience::retry::RetrySettings;
use crate::sources::oauth2::OAuth2Source;
use crate::sources::upstream::UpstreamClient;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("reqwest client")
}

pub fn no_retry() -> RetrySettings {
    RetrySettings {
        attempts: 1,
        base_delay_ms: 1,
        max_delay_ms: 1,
    }
}

/// Manager wired to a stub listening on `addr` (`/oauth/token`, `/api/v2/...`).
pub fn build_manager(addr: SocketAddr, store: Store, auto_refresh: bool, retry: RetrySettings) -> TokenManager {
    let client = build_reqwest_client();
    let oauth2 = OAuth2Source::new(
        format!("http://{}/oauth/token", addr),
        CredentialsConfig {
            client_id: "42".into(),
            client_secret: "s3cr3t".into(),
            scope: "public".into(),
        },
        client.clone(),
        retry.clone(),
    );
    let upstream = UpstreamClient::new(format!("http://{}/api/v2", addr), client, retry);
    TokenManager::new(store, oauth2, upstream, auto_refresh)
}

/// In-process stand-in for the osu! API.
///
/// The token endpoint issues `token-1`, `token-2`, ... in call order; API
/// endpoints accept any `Bearer token-*` and answer 401 (or 403) otherwise.
#[derive(Clone, Default)]
pub struct OsuStub {
    exchange_calls: Arc<AtomicUsize>,
    api_calls: Arc<AtomicUsize>,
    reject_exchange: bool,
    forbid_unknown_tokens: bool,
}

impl OsuStub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_exchange() -> Self {
        Self {
            reject_exchange: true,
            ..Self::default()
        }
    }

    pub fn forbidding_unknown_tokens() -> Self {
        Self {
            forbid_unknown_tokens: true,
            ..Self::default()
        }
    }

    pub async fn spawn(&self) -> (JoinHandle<()>, SocketAddr) {
        let router = Router::new()
            .route("/oauth/token", post(exchange))
            .route("/api/v2/me", get(me))
            .route("/api/v2/users/{user_id}/osu", get(user))
            .route("/api/v2/users/{user_id}/scores/best", get(best_scores))
            .with_state(self.clone());
        spawn_axum(router).await
    }

    pub fn exchanges(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn api_hits(&self) -> usize {
        self.api_calls.load(Ordering::SeqCst)
    }
}

async fn exchange(State(stub): State<OsuStub>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let n = stub.exchange_calls.fetch_add(1, Ordering::SeqCst) + 1;
    if stub.reject_exchange || body["grant_type"] != "client_credentials" {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid_client" })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "token_type": "Bearer",
            "expires_in": 86400,
            "access_token": format!("token-{}", n)
        })),
    )
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Bearer token-"))
        .unwrap_or(false)
}

fn unauthorized(stub: &OsuStub) -> (StatusCode, Json<Value>) {
    if stub.forbid_unknown_tokens {
        return (StatusCode::FORBIDDEN, Json(json!({ "error": "forbidden" })));
    }
    (StatusCode::UNAUTHORIZED, Json(json!({ "authentication": "basic" })))
}

async fn me(State(stub): State<OsuStub>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    stub.api_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized(&stub);
    }
    (StatusCode::OK, Json(json!({ "id": 1, "username": "proxy-app" })))
}

async fn user(
    State(stub): State<OsuStub>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    stub.api_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized(&stub);
    }
    (
        StatusCode::OK,
        Json(json!({ "id": user_id, "username": format!("player-{}", user_id) })),
    )
}

async fn best_scores(
    State(stub): State<OsuStub>,
    Path(user_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    stub.api_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized(&stub);
    }
    (
        StatusCode::OK,
        Json(json!([{ "user_id": user_id, "params": params }])),
    )
}
