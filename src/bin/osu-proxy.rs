use std::path::Path;

use anyhow::Result;
use clap::Parser;
use osu_proxy::config::proc_loader::file_to_config;
use osu_proxy::credential::{CredentialStore, Store};
use osu_proxy::manager::TokenManager;
use osu_proxy::server;
use osu_proxy::utils::logging;
use osu_proxy::utils::logging::LogLevel;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "osu-proxy.yaml")]
    config: String,
    /// env file holding CLIENT_ID / CLIENT_SECRET; loaded before the config is expanded
    #[arg(long, env = "ENV_FILE", default_value = ".env")]
    env_file: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Make preparations
    //
    // read args, load application credentials from the env file
    // -------------------------------

    let args = Args::parse();
    let env_loaded = dotenvy::from_path(Path::new(&args.env_file)).is_ok();

    // -------------------------------
    // 2. Load YAML config
    // -------------------------------

    let service_config = file_to_config(Path::new(&args.config)).await?;
    logging::run(&service_config, args.log_level);
    if !env_loaded {
        warn!("env file '{}' not loaded, relying on process environment", args.env_file);
    }

    // -------------------------------
    // 3. Build token lifecycle manager
    // -------------------------------

    let manager = TokenManager::from_config(&service_config)?;
    match manager.store().get().await {
        Ok(Some(_)) => info!("stored access token found"),
        Ok(None) => info!("no stored access token, POST /api/authenticate to obtain one"),
        Err(e) => warn!("credential store unreadable: {:#}", e),
    }
    if let Store::Memory(_) = manager.store() {
        warn!("in-memory credential store: tokens are lost on restart");
    }

    // -------------------------------
    // 4. Start http server
    // -------------------------------

    info!("Service starting...");
    server::server::start(&service_config.settings, manager).await
}
