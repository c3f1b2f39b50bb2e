use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::event_log::DEFAULT_EVENT_LOG_CAPACITY;

/// Main configuration structure for watchpost
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Path of the persisted session snapshot
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Tick timer configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Simulated metric drift configuration
    #[serde(default)]
    pub evolution: EvolutionConfig,

    /// Narrative cycle configuration
    #[serde(default)]
    pub narrative: NarrativeConfig,

    /// Remote narrator configuration
    #[serde(default)]
    pub narrator: NarratorConfig,

    /// Frame capture configuration
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_state_path() -> PathBuf {
    PathBuf::from(".watchpost/session.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            scheduler: SchedulerConfig::default(),
            evolution: EvolutionConfig::default(),
            narrative: NarrativeConfig::default(),
            narrator: NarratorConfig::default(),
            capture: CaptureConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Tick timer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Tick period in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// A narrative cycle is requested every this many ticks
    #[serde(default = "default_narrative_every_ticks")]
    pub narrative_every_ticks: u64,
}

const fn default_tick_interval_ms() -> u64 {
    1000
}

const fn default_narrative_every_ticks() -> u64 {
    15
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            narrative_every_ticks: default_narrative_every_ticks(),
        }
    }
}

/// Simulated metric drift configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EvolutionConfig {
    /// Smallest per-tick increment of the processed counter
    #[serde(default = "default_processed_min")]
    pub processed_min: u64,

    /// Largest per-tick increment of the processed counter
    #[serde(default = "default_processed_max")]
    pub processed_max: u64,

    /// Largest per-tick gain of the precision rate
    #[serde(default = "default_precision_step_max")]
    pub precision_step_max: f64,

    /// Largest per-tick gain of the coverage index
    #[serde(default = "default_coverage_step_max")]
    pub coverage_step_max: f64,

    /// Largest per-tick gain of the lock strength
    #[serde(default = "default_lock_step_max")]
    pub lock_step_max: f64,

    /// Downtime at or below this many seconds is not reconciled
    #[serde(default = "default_downtime_threshold_secs")]
    pub downtime_threshold_secs: u64,

    /// Maximum number of event log entries kept (50-100)
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,
}

const fn default_processed_min() -> u64 {
    12
}

const fn default_processed_max() -> u64 {
    48
}

const fn default_precision_step_max() -> f64 {
    0.02
}

const fn default_coverage_step_max() -> f64 {
    0.05
}

const fn default_lock_step_max() -> f64 {
    0.04
}

const fn default_downtime_threshold_secs() -> u64 {
    5
}

const fn default_event_log_capacity() -> usize {
    DEFAULT_EVENT_LOG_CAPACITY
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            processed_min: default_processed_min(),
            processed_max: default_processed_max(),
            precision_step_max: default_precision_step_max(),
            coverage_step_max: default_coverage_step_max(),
            lock_step_max: default_lock_step_max(),
            downtime_threshold_secs: default_downtime_threshold_secs(),
            event_log_capacity: default_event_log_capacity(),
        }
    }
}

/// Narrative cycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NarrativeConfig {
    /// Whether the remote narrator is consulted at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Descriptor of what the dashboard is watching
    #[serde(default = "default_target")]
    pub target: String,

    /// Upper bound on one narrator call, in seconds
    #[serde(default = "default_narrative_timeout_secs")]
    pub timeout_secs: u64,

    /// Upper bound on one frame capture, in seconds
    #[serde(default = "default_capture_timeout_secs")]
    pub capture_timeout_secs: u64,

    /// Number of recent log messages summarized in the context
    #[serde(default = "default_recent_events")]
    pub recent_events: usize,

    /// Local messages used when the narrator fails (empty = built-in pool)
    #[serde(default)]
    pub fallback_messages: Vec<String>,
}

fn default_target() -> String {
    "Primary target".to_string()
}

const fn default_narrative_timeout_secs() -> u64 {
    20
}

const fn default_capture_timeout_secs() -> u64 {
    2
}

const fn default_recent_events() -> usize {
    5
}

const fn default_true() -> bool {
    true
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            target: default_target(),
            timeout_secs: default_narrative_timeout_secs(),
            capture_timeout_secs: default_capture_timeout_secs(),
            recent_events: default_recent_events(),
            fallback_messages: Vec::new(),
        }
    }
}

/// Remote narrator (Anthropic Messages API) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NarratorConfig {
    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for narration
    #[serde(default = "default_model")]
    pub model: String,

    /// `anthropic-version` header value
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Maximum tokens in a narration
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// API key (falls back to `ANTHROPIC_API_KEY`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

const fn default_max_tokens() -> u32 {
    120
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_version: default_api_version(),
            max_tokens: default_max_tokens(),
            api_key: None,
        }
    }
}

impl NarratorConfig {
    /// Get API key from config or environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Frame capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CaptureConfig {
    /// File an external camera tool keeps overwriting with its latest frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_path: Option<PathBuf>,

    /// Frames older than this many seconds are ignored
    #[serde(default = "default_max_frame_age_secs")]
    pub max_frame_age_secs: u64,
}

const fn default_max_frame_age_secs() -> u64 {
    10
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            frame_path: None,
            max_frame_age_secs: default_max_frame_age_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stdout only when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Whether to log to stdout
    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    /// Rotation policy for file logs: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            enable_stdout: default_true(),
            rotation: default_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.scheduler.tick_interval_ms, 1000);
        assert_eq!(config.scheduler.narrative_every_ticks, 15);
        assert_eq!(config.evolution.downtime_threshold_secs, 5);
        assert_eq!(config.evolution.event_log_capacity, 50);
        assert!(config.narrative.enabled);
        assert!(config.narrative.fallback_messages.is_empty());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: Config = serde_yaml::from_str("scheduler:\n  narrative_every_ticks: 30\n").unwrap();
        assert_eq!(config.scheduler.narrative_every_ticks, 30);
        assert_eq!(config.scheduler.tick_interval_ms, 1000);
        assert_eq!(config.narrator.api_version, "2023-06-01");
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let narrator = NarratorConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert_eq!(narrator.resolve_api_key().as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        temp_env::with_var("ANTHROPIC_API_KEY", None::<&str>, || {
            let narrator = NarratorConfig {
                api_key: Some("   ".to_string()),
                ..Default::default()
            };
            assert!(narrator.resolve_api_key().is_none());
        });
    }
}
