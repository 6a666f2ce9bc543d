//! Configuration management for feedmirror.
//!
//! Configuration is read from `~/.config/feedmirror/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::FeedMeta;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mirror: MirrorConfig,
    pub fetcher: FetcherConfig,
}

/// What to do with a stored record that cannot be decoded during export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidRecordPolicy {
    /// Leave the record out of the exported document
    #[default]
    Skip,
    /// Abort the export with the decoding error
    Fail,
}

/// Options for a [`FeedMirror`](crate::mirror::FeedMirror).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Fetch each new item's link during update and store it under `scrap/`
    pub scrap: bool,

    /// Number of items exported when no limit is given
    pub export_limit: usize,

    pub on_invalid_record: InvalidRecordPolicy,

    /// Feed metadata used when the archive has no `metadata.json`
    pub defaults: FeedMeta,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            scrap: false,
            export_limit: 50,
            on_invalid_record: InvalidRecordPolicy::Skip,
            defaults: FeedMeta::new("Untitled feed", "", ""),
        }
    }
}

impl MirrorConfig {
    pub fn with_scrap(scrap: bool) -> Self {
        Self {
            scrap,
            ..Default::default()
        }
    }
}

/// HTTP client settings used for feed downloads and scraping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Request timeout in seconds (default: 10)
    pub timeout_secs: u64,

    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: concat!("feedmirror/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetcherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/feedmirror/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("feedmirror").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> &'static str {
        r##"# feedmirror configuration

[mirror]
# Fetch the page behind every new item's link and store it under scrap/<id>
scrap = false

# Number of items written by `feedmirror export` when --limit is not given
export_limit = 50

# Stored records that fail to decode during export: "skip" or "fail"
on_invalid_record = "skip"

# Feed metadata used until the first update or set-meta writes metadata.json
[mirror.defaults]
title = "Untitled feed"
description = ""
link = ""

[fetcher]
# Request timeout in seconds
timeout_secs = 10

user_agent = "feedmirror/0.1.0"
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
