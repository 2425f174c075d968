//! # Job State Machine
//!
//! Lifecycle states, the events that move a job between them, and the
//! transition rules with their guards.
//!
//! ```text
//! queued ──► selecting_recipe ──► running ──► completed
//!   │               │                │
//!   └───────────────┴────────────────┴──► failed | cancelled
//! ```

pub mod errors;
pub mod events;
pub mod job_state_machine;
pub mod states;

pub use errors::{StateMachineError, StateMachineResult};
pub use events::JobEvent;
pub use job_state_machine::JobStateMachine;
pub use states::JobStatus;
