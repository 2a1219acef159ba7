//! Bridge configuration
//!
//! TOML-backed settings with serde defaults. A missing config file yields
//! the defaults; a present but malformed file is an error so bad edits do
//! not silently fall back.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write the config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Bridge settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Name the bridge announces to the peer
    pub app_name: String,
    /// Label of the scene graph root node
    pub root_label: String,
    /// Deferred task queue capacity; tasks beyond this are dropped per tick
    pub queue_capacity: usize,
    /// Name of the published spawnable-template string list
    pub catalog_list_name: String,
    /// Byte cap per entry in published string lists
    pub string_list_max_len: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            app_name: "SceneLink".to_string(),
            root_label: "World".to_string(),
            queue_capacity: 1024,
            catalog_list_name: "spawnables".to_string(),
            string_list_max_len: 256,
        }
    }
}

impl BridgeConfig {
    /// Load from a TOML file, falling back to defaults when the file does
    /// not exist.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        info!(path = %path.display(), "loaded bridge config");
        Ok(config)
    }

    /// Write the current settings as TOML
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}
