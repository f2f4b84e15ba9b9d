//! Persistent settings model and file-backed manager.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const QUALIFIER: &str = "dev";
const ORGANIZATION: &str = "trackerkit";
const APPLICATION: &str = "trackerkit";
const SETTINGS_FILE: &str = "settings.json";

/// Upper bound applied to every TTL on load.
pub const MAX_TTL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a home directory for settings")]
    NoHomeDirectory,
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Default TTL for cached reads, in seconds.
fn default_ttl_secs() -> u64 {
    300
}

/// Queue lists change rarely; they are cached longer.
fn default_queue_ttl_secs() -> u64 {
    3600
}

/// Settings persisted on disk.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Overrides the platform cache directory when set.
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
    #[serde(default = "default_queue_ttl_secs")]
    pub queue_ttl_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: None,
            default_ttl_secs: default_ttl_secs(),
            queue_ttl_secs: default_queue_ttl_secs(),
        }
    }
}

impl Settings {
    /// Clamps TTLs and drops a blank cache directory override.
    pub fn sanitized(mut self) -> Self {
        if self
            .cache_dir
            .as_ref()
            .is_some_and(|dir| dir.as_os_str().to_string_lossy().trim().is_empty())
        {
            self.cache_dir = None;
        }
        for ttl in [&mut self.default_ttl_secs, &mut self.queue_ttl_secs] {
            if *ttl > MAX_TTL_SECS {
                debug!("clamping ttl {}s to {}s", ttl, MAX_TTL_SECS);
                *ttl = MAX_TTL_SECS;
            }
        }
        self
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn queue_ttl(&self) -> Duration {
        Duration::from_secs(self.queue_ttl_secs)
    }
}

/// Loads and saves [`Settings`] as JSON in the platform config directory.
pub struct SettingsManager {
    path: PathBuf,
    default_cache_dir: PathBuf,
}

impl SettingsManager {
    /// Creates a manager bound to the platform-specific config and cache paths.
    pub fn new() -> Result<Self, ConfigError> {
        let dirs = directories::ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .ok_or(ConfigError::NoHomeDirectory)?;
        Ok(Self {
            path: dirs.config_dir().join(SETTINGS_FILE),
            default_cache_dir: dirs.cache_dir().to_path_buf(),
        })
    }

    /// Creates a manager for an explicit settings file and cache location.
    pub fn with_paths(path: impl Into<PathBuf>, default_cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            default_cache_dir: default_cache_dir.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads settings from disk, falling back to defaults on read/parse errors.
    pub fn load(&self) -> Settings {
        if !self.path.exists() {
            return Settings::default();
        }
        let parsed = fs::read_to_string(&self.path)
            .map_err(ConfigError::from)
            .and_then(|content| serde_json::from_str::<Settings>(&content).map_err(ConfigError::from));
        match parsed {
            Ok(settings) => settings.sanitized(),
            Err(err) => {
                warn!(
                    "ignoring unreadable settings at {}: {}",
                    self.path.display(),
                    err
                );
                Settings::default()
            }
        }
    }

    /// Persists settings, creating parent directories when needed.
    pub fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Directory the response cache should use under `settings`.
    pub fn cache_dir(&self, settings: &Settings) -> PathBuf {
        settings
            .cache_dir
            .clone()
            .unwrap_or_else(|| self.default_cache_dir.clone())
    }
}
