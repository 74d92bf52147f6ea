use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::config::settings::{StoreConfig, StoreKind};
use crate::credential::env_file;
use crate::credential::token::Credential;
use crate::observability::metrics::get_metrics;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Persistence for the single current credential.
pub trait CredentialStore {
    /// Read the current credential. Never cached: every call goes to the backing storage.
    fn get(&self) -> impl std::future::Future<Output = Result<Option<Credential>>> + Send;

    /// Replace the current credential.
    fn set(&self, credential: &Credential) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone)]
pub enum Store {
    EnvFile(EnvFileStore),
    Memory(MemoryStore),
}

impl Store {
    pub fn from_config(cfg: &StoreConfig) -> Self {
        match cfg.kind {
            StoreKind::EnvFile => Store::EnvFile(EnvFileStore::new(&cfg.path, &cfg.token_key)),
            StoreKind::Memory => Store::Memory(MemoryStore::new()),
        }
    }
}

impl CredentialStore for Store {
    async fn get(&self) -> Result<Option<Credential>> {
        match self {
            Store::EnvFile(s) => s.get().await,
            Store::Memory(s) => s.get().await,
        }
    }

    async fn set(&self, credential: &Credential) -> Result<()> {
        match self {
            Store::EnvFile(s) => s.set(credential).await,
            Store::Memory(s) => s.set(credential).await,
        }
    }
}

/// Credential kept as one `KEY=VALUE` line of an env file.
///
/// Writes rewrite the whole file into a sibling temp file and rename it over
/// the target, holding a single-writer lock for the read-modify-write cycle.
#[derive(Debug, Clone)]
pub struct EnvFileStore {
    path: PathBuf,
    key: String,
    write_lock: Arc<Mutex<()>>,
}

impl EnvFileStore {
    pub fn new(path: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            key: key.to_owned(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn read_content(&self) -> Result<String> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e).with_context(|| format!("read env file '{}'", self.path.display())),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "env".to_owned());
        let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.path
            .with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), n))
    }

    async fn write_atomic(&self, content: &str) -> Result<()> {
        let tmp = self.tmp_path();
        fs::write(&tmp, content.as_bytes())
            .await
            .with_context(|| format!("write temp file '{}'", tmp.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("replace env file '{}'", self.path.display()));
        }
        Ok(())
    }
}

impl CredentialStore for EnvFileStore {
    async fn get(&self) -> Result<Option<Credential>> {
        let content = self.read_content().await?;
        Ok(env_file::read_value(&content, &self.key)
            .filter(|value| !value.is_empty())
            .map(Credential::new))
    }

    async fn set(&self, credential: &Credential) -> Result<()> {
        let metrics = get_metrics().await;
        let _guard = self.write_lock.lock().await;

        let current = self.read_content().await?;
        let updated = env_file::upsert_value(&current, &self.key, &credential.access_token);
        debug!("env file '{}' rewrite, key '{}'", self.path.display(), self.key);

        self.write_atomic(&updated)
            .await
            .inspect(|_| {
                info!("credential stored, key '{}', path '{}'", self.key, self.path.display());
                metrics.store_writes.with_label_values(&["env_file"]).inc();
            })
            .inspect_err(|err| {
                error!("{:#}", err);
                metrics.store_failures.with_label_values(&["env_file"]).inc();
            })
    }
}

/// In-process store, used for tests and `store.kind: memory`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Option<Credential>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(credential))),
        }
    }
}

impl CredentialStore for MemoryStore {
    async fn get(&self) -> Result<Option<Credential>> {
        Ok(self.inner.read().await.clone())
    }

    async fn set(&self, credential: &Credential) -> Result<()> {
        let metrics = get_metrics().await;
        *self.inner.write().await = Some(credential.clone());
        metrics.store_writes.with_label_values(&["memory"]).inc();
        Ok(())
    }
}
