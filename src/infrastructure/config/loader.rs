use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::event_log::{MAX_EVENT_LOG_CAPACITY, MIN_EVENT_LOG_CAPACITY};

/// Project-local configuration directory
pub const CONFIG_DIR: &str = ".watchpost";

/// Primary project configuration file, created by `init`
pub const CONFIG_FILE: &str = ".watchpost/config.yaml";

/// Optional local overrides
pub const LOCAL_CONFIG_FILE: &str = ".watchpost/local.yaml";

/// Prefix of environment variable overrides
pub const ENV_PREFIX: &str = "WATCHPOST_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid tick_interval_ms: {0}. Must be positive")]
    InvalidTickInterval(u64),

    #[error("Invalid narrative_every_ticks: {0}. Must be at least 1")]
    InvalidNarrativeEvery(u64),

    #[error("Invalid processed range: processed_min ({0}) must not exceed processed_max ({1})")]
    InvalidProcessedRange(u64, u64),

    #[error("Invalid {name}: {value}. Must be a finite value between 0 and 100")]
    InvalidStep { name: &'static str, value: f64 },

    #[error("Invalid event_log_capacity: {0}. Must be between {MIN_EVENT_LOG_CAPACITY} and {MAX_EVENT_LOG_CAPACITY}")]
    InvalidLogCapacity(usize),

    #[error("Invalid {0}: must be positive")]
    InvalidTimeout(&'static str),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("State path cannot be empty")]
    EmptyStatePath,

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .watchpost/config.yaml (project config, created by init)
    /// 3. .watchpost/local.yaml (project local overrides, optional)
    /// 4. Environment variables (WATCHPOST_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(CONFIG_FILE))
            .merge(Yaml::file(LOCAL_CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file. Environment overrides still
    /// apply on top of it.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise from the project hierarchy
    pub fn load_optional(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load(),
        }
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.state_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyStatePath);
        }

        // Scheduler
        if config.scheduler.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidTickInterval(0));
        }
        if config.scheduler.narrative_every_ticks == 0 {
            return Err(ConfigError::InvalidNarrativeEvery(0));
        }

        // Evolution
        let evolution = &config.evolution;
        if evolution.processed_min > evolution.processed_max {
            return Err(ConfigError::InvalidProcessedRange(
                evolution.processed_min,
                evolution.processed_max,
            ));
        }
        for (name, value) in [
            ("precision_step_max", evolution.precision_step_max),
            ("coverage_step_max", evolution.coverage_step_max),
            ("lock_step_max", evolution.lock_step_max),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::InvalidStep { name, value });
            }
        }
        if !(MIN_EVENT_LOG_CAPACITY..=MAX_EVENT_LOG_CAPACITY)
            .contains(&evolution.event_log_capacity)
        {
            return Err(ConfigError::InvalidLogCapacity(evolution.event_log_capacity));
        }

        // Narrative
        if config.narrative.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout("narrative.timeout_secs"));
        }
        if config.narrative.capture_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout("narrative.capture_timeout_secs"));
        }
        if !config.narrative.fallback_messages.is_empty()
            && config
                .narrative
                .fallback_messages
                .iter()
                .all(|m| m.trim().is_empty())
        {
            return Err(ConfigError::ValidationFailed(
                "narrative.fallback_messages must contain at least one non-blank message"
                    .to_string(),
            ));
        }
        if config.narrator.max_tokens == 0 {
            return Err(ConfigError::ValidationFailed(
                "narrator.max_tokens must be positive".to_string(),
            ));
        }

        // Logging
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}
