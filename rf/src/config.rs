//! Configuration for racefree

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::heartbeat::HeartbeatConfig;
use crate::scenarios::{FanInConfig, LoopCaptureConfig};

const CONFIG_FILE: &str = "racefree.yml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR); the CLI flag wins
    pub log_level: Option<String>,

    /// Watchdog scenario checker settings
    pub heartbeat: HeartbeatConfig,

    /// File fan-in scenario settings
    pub fan_in: FanInConfig,

    /// Loop-capture scenario settings
    pub loop_capture: LoopCaptureConfig,
}

impl Config {
    /// Load config with fallback chain: explicit path, user config, local
    /// `racefree.yml`, then defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::candidate_paths() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Peek at the configured log level before logging is initialized
    ///
    /// Errors are swallowed; the full `load` reports them once logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let path = match config_path {
            Some(path) => path.clone(),
            None => Self::candidate_paths().into_iter().find(|p| p.exists())?,
        };
        let content = fs::read_to_string(path).ok()?;
        let config: Self = serde_yaml::from_str(&content).ok()?;
        config.log_level
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "Config::save: called");
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, content).context(format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("racefree").join(CONFIG_FILE));
        }
        paths.push(PathBuf::from(CONFIG_FILE));
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}
