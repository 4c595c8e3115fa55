//! Configuration types for the Truth Engine history core

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, TruthError};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TruthConfig {
    /// Durable store configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Toast, export prompt and playback timings
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Query orchestration settings
    #[serde(default)]
    pub query: QueryConfig,

    /// Defaults applied when no preference has been persisted yet
    #[serde(default)]
    pub preferences: PreferenceDefaults,
}

/// Durable store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one file per store key
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|dir| dir.join("truth-engine"))
            .unwrap_or_else(|| PathBuf::from("./data/truth-engine"));
        Self { data_dir }
    }
}

/// Notification timings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// How long a toast stays visible
    #[serde(with = "humantime_serde")]
    pub toast_duration: Duration,

    /// How long the export prompt stays visible after a successful query
    #[serde(with = "humantime_serde")]
    pub export_prompt_duration: Duration,

    /// Period of the simulated playback ticker
    #[serde(with = "humantime_serde")]
    pub tts_tick: Duration,

    /// Progress added per tick (percent)
    pub tts_step: u8,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            toast_duration: Duration::from_millis(3000),
            export_prompt_duration: Duration::from_millis(5000),
            tts_tick: Duration::from_millis(100),
            tts_step: 1,
        }
    }
}

/// Query orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Number of session turns rendered into the follow-up context
    pub context_window: usize,

    /// Simulated latency of the mock answer provider
    #[serde(with = "humantime_serde")]
    pub mock_latency: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            context_window: 5,
            mock_latency: Duration::from_millis(1000),
        }
    }
}

/// Preference defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceDefaults {
    pub theme: String,
    pub model: String,
}

impl Default for PreferenceDefaults {
    fn default() -> Self {
        Self {
            theme: "silvery".to_string(),
            model: "WORKERS_AI".to_string(),
        }
    }
}

/// Builder for TruthConfig
pub struct ConfigBuilder {
    config: TruthConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            config: TruthConfig::default(),
        }
    }

    /// Set the data directory
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage.data_dir = dir.into();
        self
    }

    /// Set notification timings
    pub fn notifications(mut self, config: NotificationConfig) -> Self {
        self.config.notifications = config;
        self
    }

    /// Set query settings
    pub fn query(mut self, config: QueryConfig) -> Self {
        self.config.query = config;
        self
    }

    /// Set preference defaults
    pub fn preferences(mut self, defaults: PreferenceDefaults) -> Self {
        self.config.preferences = defaults;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`TruthError::Configuration`] for the same values `load` rejects.
    pub fn build(self) -> Result<TruthConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TruthConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. Configuration file (`truth.toml`, then the path in `TRUTH_CONFIG_PATH`)
    /// 3. Environment overrides (`TRUTH_NOTIFICATIONS__TOAST_DURATION=2s`)
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration source is invalid.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(TruthConfig::default()))
            .merge(Toml::file("truth.toml"));

        if let Ok(path) = std::env::var("TRUTH_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: TruthConfig = figment
            .merge(Env::prefixed("TRUTH_").ignore(&["config_path"]).split("__"))
            .extract()
            .map_err(|e| {
                TruthError::Configuration(format!("Failed to load configuration: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let config: TruthConfig = Figment::from(Serialized::defaults(TruthConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                TruthError::Configuration(format!("Failed to load configuration file: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.query.context_window == 0 {
            return Err(TruthError::Configuration(
                "query.context_window must be at least 1".to_string(),
            ));
        }
        if self.notifications.tts_step == 0 || self.notifications.tts_step > 100 {
            return Err(TruthError::Configuration(
                "notifications.tts_step must be within 1..=100".to_string(),
            ));
        }
        if self.notifications.tts_tick.is_zero() {
            return Err(TruthError::Configuration(
                "notifications.tts_tick must be non-zero".to_string(),
            ));
        }
        if self.preferences.theme.trim().is_empty() || self.preferences.model.trim().is_empty() {
            return Err(TruthError::Configuration(
                "preference defaults must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}
