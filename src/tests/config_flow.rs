// Startup path as the binary runs it: env file loaded into the process
// environment, YAML config expanded from it, manager built from the config,
// token acquired into the same env file.

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::Result;
    use serial_test::serial;
    use tempfile::tempdir;

    use crate::config::proc_loader::file_to_config;
    use crate::config::settings::StoreKind;
    use crate::credential::{CredentialStore, Store};
    use crate::manager::{TokenManager, ValidationOutcome};
    use crate::tests::common::OsuStub;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[serial]
    async fn env_file_config_to_validated_token() -> Result<()> {
        let stub = OsuStub::new();
        let (handle, addr) = stub.spawn().await;
        let dir = tempdir()?;

        let env_path = dir.path().join(".env");
        let env_content = "OSU_PROXY_FLOW_CLIENT_ID=42\nOSU_PROXY_FLOW_CLIENT_SECRET=s3cr3t\n";
        fs::write(&env_path, env_content)?;
        dotenvy::from_path(&env_path)?;

        let config_path = dir.path().join("osu-proxy.yaml");
        fs::write(
            &config_path,
            format!(
                r#"
settings:
  server:
    host: 127.0.0.1
    port: "8000"
  retry:
    attempts: 1
  logging:
    level: debug
    format: compact
upstream:
  token_url: http://{addr}/oauth/token
  api_base_url: http://{addr}/api/v2
  timeout_ms: 2000
credentials:
  client_id: "${{OSU_PROXY_FLOW_CLIENT_ID}}"
  client_secret: "${{OSU_PROXY_FLOW_CLIENT_SECRET}}"
store:
  kind: env_file
  path: {env}
  token_key: OSU_ACCESS_TOKEN
"#,
                addr = addr,
                env = env_path.display()
            ),
        )?;

        let service_config = file_to_config(&config_path).await?;
        assert_eq!(service_config.credentials.client_id, "42");
        assert_eq!(service_config.credentials.client_secret, "s3cr3t");
        assert_eq!(service_config.store.kind, StoreKind::EnvFile);

        let manager = TokenManager::from_config(&service_config)?;
        assert!(matches!(manager.store(), Store::EnvFile(_)));
        assert_eq!(manager.validate().await?, ValidationOutcome::Acquired);
        assert_eq!(manager.validate().await?, ValidationOutcome::Valid);
        assert_eq!(stub.exchanges(), 1);

        assert_eq!(
            fs::read_to_string(&env_path)?,
            format!("{}OSU_ACCESS_TOKEN=token-1\n", env_content)
        );
        assert_eq!(manager.store().get().await?.unwrap().access_token, "token-1");

        std::env::remove_var("OSU_PROXY_FLOW_CLIENT_ID");
        std::env::remove_var("OSU_PROXY_FLOW_CLIENT_SECRET");
        handle.abort();
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn missing_config_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = file_to_config(&dir.path().join("absent.yaml")).await.unwrap_err();
        assert!(err.to_string().contains("cannot read config"));
    }
}
