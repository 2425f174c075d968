use thiserror::Error;

/// Errors raised while applying a job event
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateMachineError {
    #[error("Invalid state transition from {from} on event {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Guard condition failed: {reason}")]
    GuardFailed { reason: String },
}

/// Result type alias for state machine operations
pub type StateMachineResult<T> = Result<T, StateMachineError>;

/// Helper function to create guard failures
pub fn guard_failed(reason: impl Into<String>) -> StateMachineError {
    StateMachineError::GuardFailed {
        reason: reason.into(),
    }
}
