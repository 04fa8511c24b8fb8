//! Configuration management.
//!
//! Two layers, mirroring the split between operator settings and runtime
//! state:
//!
//! - [`Config`] is the static TOML file read once at process start: server
//!   identity, data directory, resync cadence, logging. Created by
//!   `tagforge init`, never touched by gameplay.
//! - [`RuntimeConfig`] is the JSON *document* managed by the persistence
//!   engine alongside titles and profiles: tag length limit, allowed flat
//!   colors, the gradient palette, and the admin permission level. Admin
//!   update operations mutate it and persist immediately.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tokio::fs;

use crate::gradient;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Display name used in log lines and `status` output.
    pub name: String,
    /// Title id auto-granted (and activated) when a profile is first created.
    pub default_title: String,
    /// Interval in seconds for the periodic display resynchronization sweep.
    pub sync_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

/// Static startup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Write the default configuration file.
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                name: "tagforge".to_string(),
                default_title: "default".to_string(),
                sync_interval_secs: 60,
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("tagforge.log".to_string()),
            },
        }
    }
}

/// Runtime-mutable configuration document, persisted as `config.json` in the
/// data directory. Field names match the on-disk document shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    pub max_tag_length: usize,
    pub allowed_colors: BTreeSet<String>,
    pub gradient_palette: Vec<String>,
    pub admin_permission_level: u8,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            max_tag_length: 16,
            allowed_colors: ["red", "blue", "green", "gradient"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            gradient_palette: gradient::default_palette(),
            admin_permission_level: 3,
        }
    }
}

impl RuntimeConfig {
    /// True if `palette` is usable: at least two entries, each a known `§`
    /// code from the color table.
    pub fn palette_is_valid(palette: &[String]) -> bool {
        palette.len() >= 2 && palette.iter().all(|c| gradient::is_color_code(c))
    }

    /// Repair a freshly loaded document: an unusable palette is replaced with
    /// the default and logged, so a hand-edited config file can never disable
    /// rendering.
    pub fn sanitized(mut self) -> Self {
        if !Self::palette_is_valid(&self.gradient_palette) {
            log::warn!(
                "gradient palette {:?} is invalid (need >= 2 known codes); using default",
                self.gradient_palette
            );
            self.gradient_palette = gradient::default_palette();
        }
        self
    }
}
