//! # Stage Error Classification
//!
//! Decides, for each failed stage attempt, whether another attempt is made and
//! how long to wait first.
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ StageError      │────▶│ ErrorClassifier │────▶│ Classification  │
//! │ + ErrorContext  │     │ Strategy        │     │ (retry? delay?) │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```

use super::backoff_calculator::BackoffCalculator;
use crate::error::StageError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Context information for error classification
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Stage (or director) label
    pub stage: String,

    /// Current attempt number (1-based)
    pub attempt_number: u32,

    /// Maximum allowed attempts
    pub max_attempts: u32,

    /// How long the attempt ran before failing
    pub execution_duration: Duration,
}

/// Result of error classification
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorClassification {
    pub error_category: ErrorCategory,
    pub is_retryable: bool,
    /// Recommended delay before retry (if retryable)
    pub retry_delay: Option<Duration>,
    pub error_message: String,
    pub is_final_attempt: bool,
}

/// Primary error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Will never succeed if retried
    Permanent,
    /// May succeed on retry
    Transient,
    /// Exceeded the stage's wall-clock budget
    Timeout,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Permanent => write!(f, "permanent"),
            ErrorCategory::Transient => write!(f, "transient"),
            ErrorCategory::Timeout => write!(f, "timeout"),
        }
    }
}

impl From<&StageError> for ErrorCategory {
    fn from(error: &StageError) -> Self {
        match error {
            StageError::Timeout(_) => ErrorCategory::Timeout,
            StageError::Transient(_) => ErrorCategory::Transient,
            StageError::Permanent(_) => ErrorCategory::Permanent,
        }
    }
}

/// Trait for error classification strategies
pub trait ErrorClassifier: Send + Sync {
    /// Classify an error and provide handling recommendations
    fn classify_error(&self, error: &StageError, context: &ErrorContext) -> ErrorClassification;

    /// Get the classifier name for identification
    fn classifier_name(&self) -> &'static str;
}

/// Retries transient failures and timeouts until the attempt budget runs out
#[derive(Debug, Clone, Default)]
pub struct StandardErrorClassifier {
    backoff: BackoffCalculator,
}

impl StandardErrorClassifier {
    pub fn new(backoff: BackoffCalculator) -> Self {
        Self { backoff }
    }
}

impl ErrorClassifier for StandardErrorClassifier {
    fn classify_error(&self, error: &StageError, context: &ErrorContext) -> ErrorClassification {
        let error_category = ErrorCategory::from(error);
        let is_final_attempt = context.attempt_number >= context.max_attempts;
        let is_retryable = error.is_retryable() && !is_final_attempt;
        let retry_delay =
            is_retryable.then(|| self.backoff.delay_for_attempt(context.attempt_number));

        let error_message = match error {
            StageError::Timeout(limit) => format!(
                "Stage '{}' timed out after {:?} (attempt {}/{})",
                context.stage, limit, context.attempt_number, context.max_attempts
            ),
            other => format!(
                "Stage '{}' failed: {other} (attempt {}/{})",
                context.stage, context.attempt_number, context.max_attempts
            ),
        };

        ErrorClassification {
            error_category,
            is_retryable,
            retry_delay,
            error_message,
            is_final_attempt,
        }
    }

    fn classifier_name(&self) -> &'static str {
        "standard"
    }
}
