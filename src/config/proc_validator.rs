//! Configuration validation with aggregated errors.
//! Every issue is collected into one `Vec<String>` so a broken config is
//! reported in a single pass instead of one error per restart.

use regex::Regex;
use tracing::{error, info};

use crate::config::settings::{
    CredentialsConfig, RetryConfig, ServiceConfig, SettingsConfig, StoreConfig, StoreKind,
    UpstreamConfig,
};
use crate::observability::metrics::get_metrics;
use crate::utils::constants::NOT_FOUND_PATH;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_upstream(&cfg.upstream, &mut errors);
    validate_credentials(&cfg.credentials, &mut errors);
    validate_store(&cfg.store, &mut errors);

    if errors.is_empty() {
        info!("config is valid");
        Ok(())
    } else {
        let metrics = get_metrics().await;
        for e in &errors {
            error!("config: {}", e);
            metrics.config_validation_errors.inc();
        }
        Err(errors)
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if settings.server.host.trim().is_empty() {
        errors.push("settings.server.host must not be empty".to_string());
    }
    if settings.server.port.parse::<u16>().is_err() {
        errors.push(format!(
            "settings.server.port '{}' is not a valid port",
            settings.server.port
        ));
    }
    if !is_http_url(&settings.server.frontend_url) {
        errors.push(format!(
            "settings.server.frontend_url '{}' must be an http(s) url",
            settings.server.frontend_url
        ));
    }

    if let Some(retry) = &settings.retry {
        validate_retry(retry, errors);
    }

    let metrics_path = &settings.metrics.path;
    if settings.metrics.is_enabled {
        if !metrics_path.starts_with('/') {
            errors.push(format!(
                "settings.metrics.path '{}' must start with '/'",
                metrics_path
            ));
        }
        if metrics_path == "/" || metrics_path.starts_with("/api/") || metrics_path == NOT_FOUND_PATH
        {
            errors.push(format!(
                "settings.metrics.path '{}' collides with a proxy route",
                metrics_path
            ));
        }
    }

    if let Some(logging) = &settings.logging {
        if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' must be one of {:?}",
                logging.level, LOG_LEVELS
            ));
        }
    }
}

fn validate_retry(retry: &RetryConfig, errors: &mut Vec<String>) {
    if retry.attempts == Some(0) {
        errors.push("settings.retry.attempts must be >= 1".to_string());
    }
    if let (Some(base), Some(max)) = (retry.base_delay_ms, retry.max_delay_ms) {
        if max < base {
            errors.push(format!(
                "settings.retry.max_delay_ms ({}) must be >= base_delay_ms ({})",
                max, base
            ));
        }
    }
}

fn validate_upstream(upstream: &UpstreamConfig, errors: &mut Vec<String>) {
    if !is_http_url(&upstream.token_url) {
        errors.push(format!(
            "upstream.token_url '{}' must be an http(s) url",
            upstream.token_url
        ));
    }
    if !is_http_url(&upstream.api_base_url) {
        errors.push(format!(
            "upstream.api_base_url '{}' must be an http(s) url",
            upstream.api_base_url
        ));
    }
    if upstream.timeout_ms == 0 {
        errors.push("upstream.timeout_ms must be > 0".to_string());
    }
}

fn validate_credentials(credentials: &CredentialsConfig, errors: &mut Vec<String>) {
    if credentials.client_id.trim().is_empty() {
        errors.push("credentials.client_id must not be empty".to_string());
    }
    if credentials.client_secret.trim().is_empty() {
        errors.push("credentials.client_secret must not be empty".to_string());
    }
}

fn validate_store(store: &StoreConfig, errors: &mut Vec<String>) {
    // unwrap: static pattern
    let key_re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    if !key_re.is_match(&store.token_key) {
        errors.push(format!(
            "store.token_key '{}' is not a valid env key",
            store.token_key
        ));
    }
    if store.kind == StoreKind::EnvFile && store.path.trim().is_empty() {
        errors.push("store.path must not be empty for kind 'env_file'".to_string());
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
