//! Error types for the video factory core.
//!

use crate::config::ConfigurationError;
use crate::models::JobId;
use crate::state_machine::{JobStatus, StateMachineError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FactoryError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Unknown recipe: {0}")]
    UnknownRecipe(String),
    #[error("Duplicate recipe: {0}")]
    DuplicateRecipe(String),
    #[error("Job {0} not found")]
    NotFound(JobId),
    #[error("Job {job_id} is not ready: current status is {status}")]
    NotReady { job_id: JobId, status: JobStatus },
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("State transition error: {0}")]
    StateTransitionError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Scheduler is shutting down and no longer accepts jobs")]
    ShuttingDown,
    #[error("Timeout error: {0}")]
    Timeout(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FactoryError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// True for errors caused by the caller's input rather than by the system
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_)
                | Self::UnknownRecipe(_)
                | Self::NotFound(_)
                | Self::NotReady { .. }
                | Self::InvalidState(_)
        )
    }
}

impl From<ConfigurationError> for FactoryError {
    fn from(error: ConfigurationError) -> Self {
        FactoryError::ConfigurationError(error.to_string())
    }
}

impl From<StateMachineError> for FactoryError {
    fn from(error: StateMachineError) -> Self {
        FactoryError::StateTransitionError(error.to_string())
    }
}

pub type FactoryResult<T> = Result<T, FactoryError>;

/// Outcome classes a stage collaborator can report.
///
/// Only `Transient` and `Timeout` are eligible for retry; `Permanent` aborts the
/// stage on the spot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    #[error("stage timed out after {0:?}")]
    Timeout(Duration),
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("permanent failure: {0}")]
    Permanent(String),
}

impl StageError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    pub fn missing_input(what: &str) -> Self {
        Self::Permanent(format!("missing required input: {what}"))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }
}

impl From<std::io::Error> for StageError {
    fn from(error: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match error.kind() {
            ErrorKind::Interrupted
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionRefused => StageError::Transient(error.to_string()),
            _ => StageError::Permanent(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_retryability() {
        assert!(StageError::transient("connection reset").is_retryable());
        assert!(StageError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!StageError::permanent("bad voice").is_retryable());
    }

    #[test]
    fn test_io_error_mapping() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(StageError::from(refused).is_retryable());

        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(!StageError::from(missing).is_retryable());
    }

    #[test]
    fn test_client_error_classification() {
        assert!(FactoryError::validation("bad").is_client_error());
        assert!(!FactoryError::Internal("boom".to_string()).is_client_error());
        assert!(!FactoryError::ShuttingDown.is_client_error());
    }
}
