//! Configuration Management
//!
//! Optional settings read from `<config dir>/gcloudssh/config.json`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{InstanceCache, DEFAULT_CACHE_EXPIRATION};
use crate::gcp::cli::DEFAULT_GCLOUD;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Keep a local copy of the instance listing
    #[serde(default)]
    pub use_cache: Option<bool>,
    /// Seconds a cached listing stays valid
    #[serde(default)]
    pub cache_expiration_secs: Option<u64>,
    /// Directory holding the cache file
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// gcloud executable name or path
    #[serde(default)]
    pub gcloud_path: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gcloudssh").join("config.json"))
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        Self::load_from(&path)
    }

    /// Load configuration from `path`, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {:?}: {}", path, e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Failed to read config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn effective_use_cache(&self) -> bool {
        self.use_cache.unwrap_or(true)
    }

    pub fn effective_cache_expiration(&self) -> Duration {
        self.cache_expiration_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CACHE_EXPIRATION)
    }

    /// Get effective cache directory (config > ~/.gcetools)
    pub fn effective_cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(InstanceCache::default_dir()?),
        }
    }

    pub fn effective_gcloud(&self) -> String {
        self.gcloud_path
            .clone()
            .unwrap_or_else(|| DEFAULT_GCLOUD.to_string())
    }
}
