//! Application configuration.
//!
//! Only the pieces the credential core consumes live here: the API base URL
//! and the per-user configuration directory that also holds the fallback
//! token file.
//!
//! Configuration is stored at `~/.config/textonly/config.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for the config directory path
pub const APP_NAME: &str = "textonly";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Base URL used when nothing else is configured
pub const DEFAULT_API_BASE_URL: &str = "https://textonly.io/api";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the API base URL.
    ///
    /// Precedence: explicit override (the `--api` flag, which clap also fills
    /// from `TO_API`), then the config file, then the default.
    pub fn api_base_url(&self, override_url: Option<&str>) -> String {
        let chosen = override_url
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api.as_deref().filter(|v| !v.trim().is_empty()))
            .unwrap_or(DEFAULT_API_BASE_URL);
        normalize_base_url(chosen)
    }

    fn config_path() -> Result<PathBuf> {
        Ok(config_dir()?.join(CONFIG_FILE))
    }
}

/// Per-user configuration directory, e.g. `~/.config/textonly`.
pub fn config_dir() -> Result<PathBuf> {
    let root = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
    Ok(root.join(APP_NAME))
}

/// Strip surrounding whitespace and trailing slashes so routes can be appended.
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
