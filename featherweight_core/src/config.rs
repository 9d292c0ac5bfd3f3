//! Configuration file support for Featherweight.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/featherweight/config.toml`.

use crate::progression::ProgrammeRules;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub progression: ProgressionConfig,

    #[serde(default)]
    pub estimator: EstimatorConfig,

    #[serde(default)]
    pub validator: ValidatorConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Progression defaults used when no programme rules file is supplied
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressionConfig {
    #[serde(default)]
    pub rules: ProgrammeRules,

    /// How many recent performances feed a progression decision
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            rules: ProgrammeRules::default(),
            history_limit: default_history_limit(),
        }
    }
}

/// 1RM estimator parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EstimatorConfig {
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
        }
    }
}

/// Programme validator duration limits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default = "default_min_workout_minutes")]
    pub min_workout_minutes: f64,

    #[serde(default = "default_max_workout_minutes")]
    pub max_workout_minutes: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_workout_minutes: default_min_workout_minutes(),
            max_workout_minutes: default_max_workout_minutes(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("featherweight")
}

fn default_history_limit() -> usize {
    10
}

fn default_min_confidence() -> f64 {
    0.60
}

fn default_min_workout_minutes() -> f64 {
    20.0
}

fn default_max_workout_minutes() -> f64 {
    120.0
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the estimator and progression service cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.estimator.min_confidence) {
            return Err(Error::Config(format!(
                "estimator.min_confidence must be within [0, 1], got {}",
                self.estimator.min_confidence
            )));
        }
        if self.validator.min_workout_minutes > self.validator.max_workout_minutes {
            return Err(Error::Config(format!(
                "validator.min_workout_minutes ({}) exceeds max_workout_minutes ({})",
                self.validator.min_workout_minutes, self.validator.max_workout_minutes
            )));
        }
        self.progression.rules.validate()
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("featherweight").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
