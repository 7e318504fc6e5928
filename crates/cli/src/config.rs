//! CLI configuration utilities

use anyhow::{Context, Result};
use bloomkart_core::ClientConfig;
use bloomkart_core::validation::ValidateConfig;
use std::path::{Path, PathBuf};

/// Load the client configuration and apply command-line overrides
pub fn load(
    path: Option<&Path>,
    data_dir: Option<PathBuf>,
    timeout_secs: Option<u64>,
) -> Result<ClientConfig> {
    let mut config = ClientConfig::load(path).context("Failed to load configuration")?;

    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }
    if let Some(timeout_secs) = timeout_secs {
        config.api.timeout_secs = timeout_secs;
    }
    config.validate().context("Invalid command-line override")?;

    Ok(config)
}

/// Effective configuration as pretty JSON
pub fn render(config: &ClientConfig) -> Result<String> {
    Ok(serde_json::to_string_pretty(config)?)
}
