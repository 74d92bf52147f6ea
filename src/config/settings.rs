use serde::Deserialize;

use crate::utils::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_FRONTEND_URL, DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_SCOPE,
    DEFAULT_TOKEN_KEY, DEFAULT_TOKEN_URL,
};

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub settings: SettingsConfig,
    pub upstream: UpstreamConfig,
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub manager: ManagerConfig,
}

/// ================================
/// Global service-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct SettingsConfig {
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub server: ServerConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    pub attempts: Option<u32>,
    /// will be mutiply by 2 on every attempt until max_delay_ms
    pub base_delay_ms: Option<u64>,
    /// invariant: >= base_delay_ms
    pub max_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_path")]
    pub path: String,
    #[serde(default)]
    pub is_enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            path: default_metrics_path(),
            is_enabled: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: String,
    /// where `GET /` redirects to
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    /// relay the upstream status code instead of always answering 200
    #[serde(default)]
    pub relay_upstream_status: bool,
}

/// ================================
/// Upstream (osu! API)
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Application credentials for the client-credentials exchange.
#[derive(Deserialize, Clone)]
pub struct CredentialsConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_scope")]
    pub scope: String,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("scope", &self.scope)
            .finish()
    }
}

/// ================================
/// Credential store
/// ================================
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    #[default]
    EnvFile,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,
    #[serde(default = "default_env_file_path")]
    pub path: String,
    #[serde(default = "default_token_key")]
    pub token_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            path: default_env_file_path(),
            token_key: default_token_key(),
        }
    }
}

/// ================================
/// Token lifecycle policy
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ManagerConfig {
    /// acquire on a missing token and re-acquire once on a 401 for proxied calls
    #[serde(default)]
    pub auto_refresh: bool,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_frontend_url() -> String {
    DEFAULT_FRONTEND_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

fn default_env_file_path() -> String {
    ".env".to_string()
}

fn default_token_key() -> String {
    DEFAULT_TOKEN_KEY.to_string()
}
