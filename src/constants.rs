//! # System Constants
//!
//! Operational boundaries and well-known names used across the orchestration
//! core: fallback recipe, default limits, stage labels and lifecycle event names.

use crate::recipes::RecipeKind;

/// Recipe used whenever the director fails or picks something unusable
pub const FALLBACK_RECIPE: RecipeKind = RecipeKind::Ambient;

/// Stage name recorded when moving the deliverable out of scratch fails
pub const FINALIZATION_STAGE: &str = "finalization";

/// Label used for the director invocation in logs, metrics and error records
pub const RECIPE_SELECTION_STAGE: &str = "recipe_selection";

/// Stage name recorded when the scheduler itself cannot continue a job
pub const SCHEDULER_STAGE: &str = "scheduler";

/// Input validation limits
pub mod limits {
    pub const MAX_TOPIC_CHARS: usize = 500;
    pub const MAX_DURATION_SECS: f64 = 43_200.0;
    pub const LOOP_MIN_DURATION_SECS: f64 = 3_600.0;
    pub const MIN_ASSET_COUNT: u32 = 1;
    pub const MAX_ASSET_COUNT: u32 = 20;
    pub const MAX_ASSET_KEYWORDS: usize = 8;
}

/// Scheduler defaults
pub mod defaults {
    pub const MAX_CONCURRENT_JOBS: usize = 3;
    pub const MAX_IN_FLIGHT_JOBS: usize = 32;
    pub const SHUTDOWN_TIMEOUT_MS: u64 = 30_000;
    pub const EVENT_CHANNEL_CAPACITY: usize = 1024;
    pub const DIRECTOR_TIMEOUT_MS: u64 = 15_000;
    pub const DIRECTOR_MAX_ATTEMPTS: u32 = 2;
    pub const SCRATCH_ROOT: &str = "temp";
    pub const OUTPUT_ROOT: &str = "output";
}

/// Job lifecycle event names
pub mod events {
    pub const JOB_SUBMITTED: &str = "job.submitted";
    pub const JOB_RECIPE_SELECTED: &str = "job.recipe_selected";
    pub const JOB_COMPLETED: &str = "job.completed";
    pub const JOB_FAILED: &str = "job.failed";
    pub const JOB_CANCELLED: &str = "job.cancelled";

    pub const STAGE_STARTED: &str = "stage.started";
    pub const STAGE_RETRYING: &str = "stage.retrying";
    pub const STAGE_COMPLETED: &str = "stage.completed";
}
