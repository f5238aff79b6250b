//! Application configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::throttler::ThrottlerConfig;

/// Main configuration
///
/// Without a `throttler` section the demo runs with a short window, so that
/// `tt demo` works out of the box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Throttler limits
    pub throttler: ThrottlerConfig,

    /// Synthetic workload for `tt demo`
    pub demo: DemoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            throttler: ThrottlerConfig {
                time_window_secs: 0.5,
                per_time_window: 20,
                concurrency: 10,
                operation_timeout_secs: None,
            },
            demo: DemoConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .taskthrottle.yml
        let local_config = PathBuf::from(".taskthrottle.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/taskthrottle/taskthrottle.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("taskthrottle").join("taskthrottle.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        if content.trim().is_empty() {
            tracing::info!("Config file {} is empty, using defaults", path.as_ref().display());
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Demo workload configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Number of quick jobs
    pub tasks: usize,

    /// Jobs that ask to be retried before succeeding
    pub throttled: usize,

    /// How many times each throttled job asks to be retried
    pub throttle_count: u32,

    /// Jobs that fail for good
    pub failing: usize,

    /// Upper bound on a job's simulated latency
    pub max_task_ms: u64,

    /// Pause after each delivered item
    pub consumer_delay_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            tasks: 60,
            throttled: 1,
            throttle_count: 1,
            failing: 0,
            max_task_ms: 250,
            consumer_delay_ms: 0,
        }
    }
}

impl DemoConfig {
    /// Total number of jobs the demo submits
    pub fn total_jobs(&self) -> usize {
        self.tasks + self.throttled + self.failing
    }
}
