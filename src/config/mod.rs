pub mod schema;

pub use schema::AnalystConfig;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default analyst home directory (~/.pocket-analyst).
pub fn default_home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".pocket-analyst"))
        .unwrap_or_else(|| PathBuf::from(".pocket-analyst"))
}

/// Load config from the given path, or return defaults.
pub fn load_config(path: &Path) -> Result<AnalystConfig> {
    if path.exists() {
        let contents =
            std::fs::read_to_string(path).context("Failed to read analyst config file")?;
        let config: AnalystConfig =
            toml::from_str(&contents).context("Failed to parse analyst config (TOML)")?;
        Ok(config)
    } else {
        Ok(AnalystConfig::default())
    }
}

/// Save config to the given path (TOML format).
pub fn save_config(config: &AnalystConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents).context("Failed to write config file")?;
    Ok(())
}
