//! # Orchestration Engine
//!
//! Sequencing, retry and finalization of video generation jobs.
//!
//! ## Core Components
//!
//! - **PipelineScheduler**: accepts requests and drives each job from `queued`
//!   to a terminal state
//! - **StageGraph**: a recipe's stages as a validated DAG with a deterministic
//!   execution order
//! - **StageExecutor**: one stage's attempt loop with timeout, retry, backoff
//!   and panic isolation
//! - **StandardErrorClassifier**: decides whether a failed attempt is retried
//! - **BackoffCalculator**: exponential delays with optional jitter
//! - **CollaboratorDispatch**: routes stage kinds to media collaborators
//! - **ScratchSpace** / **JobFinalizer**: per-job working directories and
//!   deliverable hand-off
//!
//! ## Execution Flow
//!
//! ```text
//! submit ─► queued ─► [director] ─► running ─► stage ─► stage ─► ... ─► finalize ─► completed
//!                                     │          │                        │
//!                                     └──────────┴──── failure ──────────►┴─► failed
//!                          cancel flag checked at every boundary ─────────► cancelled
//! ```

pub mod backoff_calculator;
pub mod error_classifier;
pub mod job_finalizer;
pub mod scheduler;
pub mod scratch;
pub mod stage_dispatch;
pub mod stage_executor;
pub mod stage_graph;
pub mod types;

pub use backoff_calculator::BackoffCalculator;
pub use error_classifier::{
    ErrorCategory, ErrorClassification, ErrorClassifier, ErrorContext, StandardErrorClassifier,
};
pub use job_finalizer::JobFinalizer;
pub use scheduler::PipelineScheduler;
pub use scratch::ScratchSpace;
pub use stage_dispatch::CollaboratorDispatch;
pub use stage_executor::{StageExecutor, StageMetrics};
pub use stage_graph::StageGraph;
pub use types::{
    StageAction, StageContext, StageFailure, StageInputs, StageKind, StageOutput, StagePolicy,
    StageResult, StageSpec,
};
