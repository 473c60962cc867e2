use std::{fs, path::Path};

use anyhow::{Context, Result};

pub mod account;
pub mod address;
pub mod cfg;
pub mod client;
pub mod contracts;
pub mod error;
pub mod funding;
pub mod orchestrator;
pub mod plan;
pub mod poller;
pub mod secret;

/// Reads the deployment configuration. Relative artifact paths in the file are
/// resolved against the directory the file lives in.
pub fn read_config(config_file: &Path) -> Result<cfg::Config> {
    let config_content = fs::read_to_string(config_file)
        .with_context(|| format!("Cannot read configuration {}", config_file.display()))?;
    let mut config: cfg::Config = toml::from_str(&config_content)
        .with_context(|| format!("Cannot parse configuration {}", config_file.display()))?;

    if let Some(base) = config_file.parent() {
        config.resolve_paths(base);
    }

    Ok(config)
}
