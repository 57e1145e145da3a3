use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::models::Presets;

/// Connection settings for the remote store API.
///
/// Loaded from a JSON document (see `config/connection.example.json`).
/// The key/secret pair is the store's REST API credential.
#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionConfig {
    /// Store base URL, e.g. `https://shop.example.com`.
    pub site_url: String,
    pub client_key: String,
    pub client_secret: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Load and validate the connection config document.
pub fn load_connection(path: &Path) -> Result<ConnectionConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read connection config: {}", path.display()))?;

    let config: ConnectionConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse connection config: {}", path.display()))?;

    if !config.site_url.starts_with("http://") && !config.site_url.starts_with("https://") {
        anyhow::bail!(
            "site_url must start with http:// or https://, got '{}'",
            config.site_url
        );
    }
    if config.client_key.trim().is_empty() || config.client_secret.trim().is_empty() {
        anyhow::bail!("client_key and client_secret must not be empty");
    }
    if config.timeout_secs == 0 {
        anyhow::bail!("timeout_secs must be > 0");
    }

    Ok(config)
}

/// Load the preset fields applied to every newly created product.
pub fn load_presets(path: &Path) -> Result<Presets> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read presets: {}", path.display()))?;

    let presets: Presets = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse presets: {}", path.display()))?;

    Ok(presets)
}
