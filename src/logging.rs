//! # Structured Logging Module
//!
//! Environment-aware structured logging for the scheduler and its stage
//! workers. Console output is either human-readable or JSON lines; `RUST_LOG`
//! takes precedence over the configured level when set.

use crate::config::{LogFormat, LoggingConfig};
use crate::models::JobId;
use chrono::Utc;
use std::sync::OnceLock;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize the global subscriber once per process
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = crate::config::detect_environment();
        let log_level = config.effective_level();
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

        let layer = match config.format {
            LogFormat::Pretty => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed(),
        };

        // An embedding application may already own the global subscriber
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
            return;
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            level = %log_level,
            format = ?config.format,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Log structured data for job lifecycle operations
pub fn log_job_operation(
    operation: &str,
    job_id: JobId,
    status: Option<&str>,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        job_id = %job_id,
        status = status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🎬 JOB_OPERATION"
    );
}

/// Log structured data for stage operations
pub fn log_stage_operation(
    operation: &str,
    job_id: JobId,
    stage: &str,
    status: Option<&str>,
    attempts: Option<u32>,
    elapsed: Option<Duration>,
) {
    tracing::info!(
        operation = %operation,
        job_id = %job_id,
        stage = %stage,
        status = status,
        attempts = attempts,
        elapsed_ms = elapsed.map(|d| d.as_millis() as u64),
        timestamp = %Utc::now().to_rfc3339(),
        "🔧 STAGE_OPERATION"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig {
            level: Some("warn".to_string()),
            format: LogFormat::Json,
        };
        init_structured_logging(&config);
        init_structured_logging(&config);
        assert!(LOGGER_INITIALIZED.get().is_some());

        log_job_operation("submitted", JobId::new(), Some("queued"), None);
        log_stage_operation(
            "completed",
            JobId::new(),
            "composition",
            Some("success"),
            Some(1),
            Some(Duration::from_millis(12)),
        );
    }
}
