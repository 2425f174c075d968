//! # Configuration
//!
//! Typed configuration for the scheduler, stage execution, validation limits,
//! storage roots and logging.
//!
//! Values are layered: built-in defaults, then an optional file
//! (`config/video_factory.{toml,yaml,json}` or an explicit path), then
//! environment variables prefixed `VIDEO_FACTORY` with `__` between nested
//! keys, e.g. `VIDEO_FACTORY_SCHEDULER__MAX_CONCURRENT_JOBS=4`.

pub mod error;
pub mod loader;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::{detect_environment, ENVIRONMENT_VAR};

use crate::constants::{defaults, limits};
use crate::orchestration::types::{StagePolicy, StageSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    pub scheduler: SchedulerConfig,
    pub backoff: BackoffConfig,
    pub execution: ExecutionConfig,
    pub validation: ValidationConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl FactoryConfig {
    /// Load from the default file location and the environment
    pub fn load() -> ConfigResult<Self> {
        loader::load_from(None)
    }

    /// Load with `path` as a required file layered over the default location
    pub fn load_from(path: Option<&Path>) -> ConfigResult<Self> {
        loader::load_from(path)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.scheduler.max_concurrent_jobs == 0 {
            return Err(ConfigurationError::invalid(
                "scheduler.max_concurrent_jobs",
                "must be at least 1",
            ));
        }
        if self.scheduler.max_in_flight_jobs == 0 {
            return Err(ConfigurationError::invalid(
                "scheduler.max_in_flight_jobs",
                "must be at least 1",
            ));
        }
        if self.scheduler.event_channel_capacity == 0 {
            return Err(ConfigurationError::invalid(
                "scheduler.event_channel_capacity",
                "must be at least 1",
            ));
        }

        if self.backoff.base_delay_ms > self.backoff.max_delay_ms {
            return Err(ConfigurationError::invalid(
                "backoff.base_delay_ms",
                format!(
                    "base delay {}ms exceeds max delay {}ms",
                    self.backoff.base_delay_ms, self.backoff.max_delay_ms
                ),
            ));
        }
        if !self.backoff.multiplier.is_finite() || self.backoff.multiplier < 1.0 {
            return Err(ConfigurationError::invalid(
                "backoff.multiplier",
                "must be a finite number >= 1.0",
            ));
        }
        if !(0.0..=1.0).contains(&self.backoff.max_jitter) {
            return Err(ConfigurationError::invalid(
                "backoff.max_jitter",
                "must be between 0.0 and 1.0",
            ));
        }

        if self.execution.director_max_attempts == 0 {
            return Err(ConfigurationError::invalid(
                "execution.director_max_attempts",
                "must be at least 1",
            ));
        }
        if let Some((stage, _)) = self
            .execution
            .stage_attempt_overrides
            .iter()
            .find(|(_, attempts)| **attempts == 0)
        {
            return Err(ConfigurationError::invalid(
                format!("execution.stage_attempt_overrides.{stage}"),
                "must be at least 1",
            ));
        }

        if self.validation.max_topic_chars == 0 {
            return Err(ConfigurationError::invalid(
                "validation.max_topic_chars",
                "must be at least 1",
            ));
        }
        if !(self.validation.max_duration_secs > 0.0) {
            return Err(ConfigurationError::invalid(
                "validation.max_duration_secs",
                "must be positive",
            ));
        }
        let loop_min = self.validation.loop_min_duration_secs;
        if !(loop_min >= 0.0) || loop_min > self.validation.max_duration_secs {
            return Err(ConfigurationError::invalid(
                "validation.loop_min_duration_secs",
                "must be between 0 and validation.max_duration_secs",
            ));
        }

        Ok(())
    }
}

/// Admission and concurrency limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Compute permits shared by compute-bound stages
    pub max_concurrent_jobs: usize,
    /// Jobs allowed past `queued` at once
    pub max_in_flight_jobs: usize,
    pub shutdown_timeout_ms: u64,
    pub event_channel_capacity: usize,
}

impl SchedulerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: defaults::MAX_CONCURRENT_JOBS,
            max_in_flight_jobs: defaults::MAX_IN_FLIGHT_JOBS,
            shutdown_timeout_ms: defaults::SHUTDOWN_TIMEOUT_MS,
            event_channel_capacity: defaults::EVENT_CHANNEL_CAPACITY,
        }
    }
}

/// Configuration for backoff calculation behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub jitter_enabled: bool,
    /// Maximum jitter fraction (0.0 to 1.0)
    pub max_jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            jitter_enabled: true,
            max_jitter: 0.1,
        }
    }
}

/// Director policy and per-stage policy overrides, keyed by stage name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub director_timeout_ms: u64,
    pub director_max_attempts: u32,
    pub stage_timeout_overrides_ms: HashMap<String, u64>,
    pub stage_attempt_overrides: HashMap<String, u32>,
}

impl ExecutionConfig {
    pub fn director_policy(&self) -> StagePolicy {
        StagePolicy::new(
            Duration::from_millis(self.director_timeout_ms),
            self.director_max_attempts,
        )
    }

    /// Apply any configured overrides to a stage's policy
    pub fn apply_overrides(&self, spec: &mut StageSpec) {
        let name = spec.kind.name();
        if let Some(timeout_ms) = self.stage_timeout_overrides_ms.get(name) {
            spec.policy.timeout = Duration::from_millis(*timeout_ms);
        }
        if let Some(attempts) = self.stage_attempt_overrides.get(name) {
            spec.policy.max_attempts = (*attempts).max(1);
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            director_timeout_ms: defaults::DIRECTOR_TIMEOUT_MS,
            director_max_attempts: defaults::DIRECTOR_MAX_ATTEMPTS,
            stage_timeout_overrides_ms: HashMap::new(),
            stage_attempt_overrides: HashMap::new(),
        }
    }
}

/// Request validation limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub max_topic_chars: usize,
    pub max_duration_secs: f64,
    pub loop_min_duration_secs: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_topic_chars: limits::MAX_TOPIC_CHARS,
            max_duration_secs: limits::MAX_DURATION_SECS,
            loop_min_duration_secs: limits::LOOP_MIN_DURATION_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Parent of the per-job scratch directories
    pub scratch_root: PathBuf,
    /// Where finished deliverables are moved
    pub output_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            scratch_root: PathBuf::from(defaults::SCRATCH_ROOT),
            output_root: PathBuf::from(defaults::OUTPUT_ROOT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive; `None` picks a default for the detected environment
    pub level: Option<String>,
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn effective_level(&self) -> String {
        self.level
            .clone()
            .unwrap_or_else(|| loader::default_log_level(&detect_environment()).to_string())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::types::StageKind;

    #[test]
    fn test_defaults() {
        let config = FactoryConfig::default();
        assert_eq!(config.scheduler.max_concurrent_jobs, 3);
        assert_eq!(config.scheduler.max_in_flight_jobs, 32);
        assert_eq!(config.backoff.base_delay_ms, 500);
        assert_eq!(config.validation.max_topic_chars, 500);
        assert_eq!(config.validation.max_duration_secs, 43_200.0);
        assert_eq!(config.validation.loop_min_duration_secs, 3_600.0);
        assert_eq!(config.storage.scratch_root, PathBuf::from("temp"));
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = FactoryConfig::default();
        config.scheduler.max_concurrent_jobs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::Invalid { key, .. }) if key == "scheduler.max_concurrent_jobs"
        ));

        let mut config = FactoryConfig::default();
        config.backoff.base_delay_ms = 60_000;
        assert!(config.validate().is_err());

        let mut config = FactoryConfig::default();
        config.backoff.max_jitter = 1.5;
        assert!(config.validate().is_err());

        let mut config = FactoryConfig::default();
        config
            .execution
            .stage_attempt_overrides
            .insert("composition".to_string(), 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_loop_threshold() {
        for loop_min in [f64::NAN, -1.0, 50_000.0] {
            let mut config = FactoryConfig::default();
            config.validation.loop_min_duration_secs = loop_min;
            assert!(matches!(
                config.validate(),
                Err(ConfigurationError::Invalid { key, .. })
                    if key == "validation.loop_min_duration_secs"
            ));
        }

        let mut config = FactoryConfig::default();
        config.validation.loop_min_duration_secs = config.validation.max_duration_secs;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_stage_overrides() {
        let mut execution = ExecutionConfig::default();
        execution
            .stage_timeout_overrides_ms
            .insert("voice-synthesis".to_string(), 250);
        execution
            .stage_attempt_overrides
            .insert("voice-synthesis".to_string(), 5);

        let mut spec = StageSpec::new(StageKind::VoiceSynthesis, StagePolicy::from_secs(120, 3));
        execution.apply_overrides(&mut spec);
        assert_eq!(spec.policy.timeout, Duration::from_millis(250));
        assert_eq!(spec.policy.max_attempts, 5);

        let mut untouched = StageSpec::new(StageKind::AssetFetch, StagePolicy::from_secs(60, 3));
        execution.apply_overrides(&mut untouched);
        assert_eq!(untouched.policy, StagePolicy::from_secs(60, 3));
    }

    #[test]
    fn test_director_policy() {
        let policy = ExecutionConfig::default().director_policy();
        assert_eq!(policy.timeout, Duration::from_secs(15));
        assert_eq!(policy.max_attempts, 2);
    }
}
