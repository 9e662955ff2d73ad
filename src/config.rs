//! Configuration file parser for `<config dir>/regional_gtfs/config.toml`.
//!
//! The config file is optional. A missing or empty file yields
//! `Config::default()`; unknown keys are ignored with a warning.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::fetch::{DEFAULT_CHUNK_SIZE, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, HttpSettings};
use crate::geocode::NOMINATIM_URL;
use crate::layout::DEFAULT_DATA_ROOT;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// The feed to work on when none is given on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedConfig {
    pub region: String,
    /// Publish date in DDMMYYYY form.
    pub date: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the `raw/` and `processed/` trees.
    pub data_root: PathBuf,

    pub user_agent: String,

    /// Applies to both the feed download and geocoder requests.
    pub request_timeout_secs: u64,

    /// Bytes read from the response body per write.
    pub chunk_size: usize,

    /// Base URL of a Nominatim-compatible search API.
    pub geocoder_url: String,

    pub feed: Option<FeedConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from(DEFAULT_DATA_ROOT),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            geocoder_url: NOMINATIM_URL.to_string(),
            feed: None,
        }
    }
}

impl Config {
    const KNOWN_KEYS: [&'static str; 6] = [
        "data_root",
        "user_agent",
        "request_timeout_secs",
        "chunk_size",
        "geocoder_url",
        "feed",
    ];

    /// Default location, `None` when the platform has no config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("regional_gtfs").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        Ok(toml::from_str(content)?)
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            chunk_size: self.chunk_size,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
