use std::{fs, path::Path};

use anyhow::{anyhow, Result};
use regex::Regex;
use tracing::{debug, error};

use crate::config::proc_validator;
use crate::config::settings::{LogFormat, LoggingConfig, ServiceConfig};
use crate::observability::metrics::get_metrics;

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow!("cannot read config '{}': {}", path.display(), e))?;

    let expanded = expand_env_vars(&content)?;
    parse_config(expanded).await
}

pub async fn parse_config(content: String) -> Result<ServiceConfig> {
    let metrics = get_metrics().await;
    let mut service_config: ServiceConfig = serde_yaml::from_str(&content).inspect_err(|e| {
        error!("parse config error: {}", e);
        metrics.config_validation_errors.inc();
    })?;

    // Apply defaults
    if service_config.settings.logging.is_none() {
        service_config.settings.logging =
            Some(LoggingConfig::new("info".to_owned(), LogFormat::Compact));
    }

    debug!("validation config ...");
    proc_validator::validate_service_config(&service_config)
        .await
        .map_err(|errors| anyhow!("config is not valid: {}", errors.join("; ")))?;

    Ok(service_config)
}

/// Replace `${VAR}` and `${VAR:default}` with process environment values.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}")?;
    let expanded = re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    });
    Ok(expanded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::StoreKind;
    use serial_test::serial;

    const MINIMAL: &str = r#"
settings:
  server:
    host: 127.0.0.1
    port: "8000"
upstream: {}
credentials:
  client_id: "42"
  client_secret: "s3cr3t"
"#;

    #[tokio::test]
    async fn minimal_config_gets_defaults() {
        let cfg = parse_config(MINIMAL.to_string()).await.unwrap();

        assert_eq!(cfg.upstream.token_url, "https://osu.ppy.sh/oauth/token");
        assert_eq!(cfg.upstream.api_base_url, "https://osu.ppy.sh/api/v2");
        assert_eq!(cfg.credentials.scope, "public");
        assert_eq!(cfg.store.kind, StoreKind::EnvFile);
        assert_eq!(cfg.store.path, ".env");
        assert_eq!(cfg.store.token_key, "ACCESS_TOKEN");
        assert!(!cfg.manager.auto_refresh);
        assert!(!cfg.settings.server.relay_upstream_status);
        assert_eq!(cfg.settings.logging.unwrap().level, "info");
    }

    #[tokio::test]
    async fn empty_client_id_is_rejected() {
        let content = MINIMAL.replace("client_id: \"42\"", "client_id: \"\"");
        let err = parse_config(content).await.unwrap_err();
        assert!(err.to_string().contains("config is not valid"));
        assert!(err.to_string().contains("client_id"));
    }

    #[test]
    #[serial]
    fn expands_env_and_defaults() {
        std::env::set_var("OSU_PROXY_TEST_ID", "1234");
        std::env::remove_var("OSU_PROXY_TEST_MISSING");

        let out = expand_env_vars("id: ${OSU_PROXY_TEST_ID}, other: ${OSU_PROXY_TEST_MISSING:fallback}").unwrap();
        assert_eq!(out, "id: 1234, other: fallback");

        std::env::remove_var("OSU_PROXY_TEST_ID");
    }
}
