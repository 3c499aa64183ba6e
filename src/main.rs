use std::sync::Arc;

use anyhow::Context;

use sftp_bridge::bridge::Bridge;
use sftp_bridge::config::BridgeConfig;
use sftp_bridge::config::paths;
use sftp_bridge::sftp::SessionManager;
use sftp_bridge::ssh::auth::{load_credential, passphrase_from_env};
use sftp_bridge::ssh::KnownHosts;
use sftp_bridge::{logging, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (log_dir, log_dir_error) = match paths::ensure_log_dir() {
        Ok(dir) => (dir, None),
        Err(e) => (None, Some(e)),
    };
    let logging = logging::init_logging(log_dir.as_deref());

    tracing::info!("Starting sftp-bridge (log filter: {})", logging.filter());
    if let Some(e) = log_dir_error {
        let requested = paths::log_dir().unwrap_or_default();
        tracing::warn!(
            "Cannot create log directory {}: {}; logging to console only",
            requested.display(),
            e
        );
    }
    if let Some(file) = logging.file() {
        tracing::info!("Logging to {}.<date>", file.display());
    }

    let config = BridgeConfig::load().context("Failed to load configuration")?;

    let key_path = config.key_path();
    let passphrase = passphrase_from_env();
    let credential = load_credential(&key_path, passphrase.as_ref())
        .with_context(|| format!("Failed to load private key {}", key_path.display()))?;
    tracing::info!("Loaded {} key from {}", credential.algorithm(), key_path.display());

    let sessions = SessionManager::new(&config, credential, KnownHosts::from_default());
    let bridge = Arc::new(Bridge::from_config(&config, sessions));

    server::serve(&config, bridge)
        .await
        .with_context(|| format!("Failed to serve on {}", config.listen_addr()))
}
