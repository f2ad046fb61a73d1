use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::graph::DEFAULT_SEARCH_BOUND;
use crate::{Error, Result};

/// Tunable policy knobs for the coordination core.
///
/// All fields have defaults chosen for interactive multi-agent sessions.
/// Partial config files are fine; missing fields fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// How many recent same-resource operations a conflict check considers.
    pub conflict_window_size: usize,
    /// Maximum depth for ancestor/distance searches in the causal graph.
    pub distance_search_bound: usize,
    /// Distances strictly below this are classified severe.
    pub severe_distance: u64,
    /// Distances strictly below this (and not severe) are classified moderate.
    pub moderate_distance: u64,
    /// Whether unknown agents are registered on first operation instead of
    /// being rejected.
    pub auto_register_agents: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            conflict_window_size: 100,
            distance_search_bound: DEFAULT_SEARCH_BOUND,
            severe_distance: 5,
            moderate_distance: 20,
            auto_register_agents: true,
        }
    }
}

impl Config {
    pub fn converge_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".converge"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::converge_dir()?.join("converge.toml"))
    }

    /// Load config from the default location, falling back to defaults if
    /// no file exists.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load and validate config from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        debug!(?config, path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let dir = Self::converge_dir()?;
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        let path = Self::config_path()?;
        fs::write(&path, toml::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Reject configurations the engine cannot run with.
    ///
    /// Window size and search bound must be positive, and the severity
    /// thresholds must be strictly ordered.
    pub fn validate(&self) -> Result<()> {
        if self.conflict_window_size == 0 {
            return Err(Error::InvalidArgument(
                "conflict_window_size must be positive".to_string(),
            ));
        }
        if self.distance_search_bound == 0 {
            return Err(Error::InvalidArgument(
                "distance_search_bound must be positive".to_string(),
            ));
        }
        if self.severe_distance >= self.moderate_distance {
            return Err(Error::InvalidArgument(format!(
                "severe_distance ({}) must be below moderate_distance ({})",
                self.severe_distance, self.moderate_distance
            )));
        }
        Ok(())
    }
}
