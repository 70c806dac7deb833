use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::drag::DEFAULT_ACTIVATION_DISTANCE;
use crate::{tlog_debug, Error, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Pointer travel, in terminal cells, before a press becomes a drag.
    #[serde(default = "default_activation_distance")]
    pub drag_activation_distance: f32,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_activation_distance() -> f32 {
    DEFAULT_ACTIVATION_DISTANCE
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            drag_activation_distance: default_activation_distance(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    pub fn taskman_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".taskman"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::taskman_dir()?.join("taskman.toml"))
    }

    pub fn session_path() -> Result<PathBuf> {
        Ok(Self::taskman_dir()?.join("session.json"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Load from `~/.taskman/taskman.toml`, then apply `TASKMAN_API_URL`.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        if let Ok(url) = std::env::var("TASKMAN_API_URL") {
            if !url.trim().is_empty() {
                tlog_debug!("TASKMAN_API_URL overrides api_url={}", url);
                config.api_url = url;
            }
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        tlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            tlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        tlog_debug!(
            "Config loaded: api_url={} activation={} timeout={}s",
            config.api_url,
            config.drag_activation_distance,
            config.request_timeout_secs
        );
        Ok(config)
    }
}
