//! # Job Records
//!
//! The job record is the unit of state owned by the [`crate::store::JobStore`].
//! Its fields are only mutated by applying [`JobEvent`]s through the state
//! machine, which keeps the artifact/error invariant intact:
//!
//! - `artifact` is present exactly when `status == completed`
//! - `error` is present exactly when `status == failed`

use super::{ArtifactRef, Resolution};
use crate::config::ValidationConfig;
use crate::error::{FactoryError, FactoryResult};
use crate::orchestration::error_classifier::ErrorCategory;
use crate::orchestration::types::StageKind;
use crate::recipes::{RecipeKind, RecipeSelection};
use crate::state_machine::{JobEvent, JobStateMachine, JobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Opaque job identifier (UUID v4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = FactoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| FactoryError::ValidationError(format!("invalid job id '{s}': {e}")))
    }
}

/// Terminal error attached to a failed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub stage: String,
    pub cause: String,
    pub category: ErrorCategory,
    pub attempts: u32,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(
        stage: impl Into<String>,
        cause: impl Into<String>,
        category: ErrorCategory,
        attempts: u32,
    ) -> Self {
        Self {
            stage: stage.into(),
            cause: cause.into(),
            category,
            attempts,
            occurred_at: Utc::now(),
        }
    }
}

/// How the job's recipe was chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RecipeDecision {
    /// The caller named the recipe
    Requested,
    /// The director picked it
    Director { reasoning: String },
    /// The director could not be used; the fallback recipe applies
    Fallback { reason: String },
}

/// A validated-on-submit generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    pub recipe: RecipeSelection,
    pub duration_secs: Option<f64>,
    pub resolution: Resolution,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, recipe: RecipeSelection) -> Self {
        Self {
            topic: topic.into(),
            recipe,
            duration_secs: None,
            resolution: Resolution::default(),
        }
    }

    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Build a request from the raw strings a request layer receives
    pub fn parse(
        topic: &str,
        recipe: &str,
        duration_secs: Option<f64>,
        resolution: &str,
    ) -> FactoryResult<Self> {
        Ok(Self {
            topic: topic.to_string(),
            recipe: recipe.parse()?,
            duration_secs,
            resolution: resolution.parse()?,
        })
    }

    /// Field-level checks that do not depend on the recipe registry
    pub fn validate(&self, limits: &ValidationConfig) -> FactoryResult<()> {
        let chars = self.topic.trim().chars().count();
        if chars == 0 {
            return Err(FactoryError::validation("topic must not be empty"));
        }
        if chars > limits.max_topic_chars {
            return Err(FactoryError::ValidationError(format!(
                "topic must be at most {} characters (got {chars})",
                limits.max_topic_chars
            )));
        }

        if let Some(duration) = self.duration_secs {
            if !duration.is_finite() || duration <= 0.0 {
                return Err(FactoryError::ValidationError(format!(
                    "duration must be a positive number of seconds (got {duration})"
                )));
            }
            if duration > limits.max_duration_secs {
                return Err(FactoryError::ValidationError(format!(
                    "duration must be at most {} seconds (got {duration})",
                    limits.max_duration_secs
                )));
            }
        }

        Ok(())
    }
}

/// Job record owned by the job store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub(crate) id: JobId,
    pub(crate) topic: String,
    pub(crate) requested_recipe: RecipeSelection,
    pub(crate) resolved_recipe: Option<RecipeKind>,
    pub(crate) recipe_decision: Option<RecipeDecision>,
    pub(crate) requested_duration_secs: Option<f64>,
    pub(crate) resolution: Resolution,
    pub(crate) status: JobStatus,
    pub(crate) planned_stages: Vec<StageKind>,
    pub(crate) completed_stages: Vec<StageKind>,
    pub(crate) current_stage: Option<StageKind>,
    pub(crate) error: Option<ErrorRecord>,
    pub(crate) artifact: Option<ArtifactRef>,
    pub(crate) cancel_requested: bool,
    pub(crate) metadata: HashMap<String, Value>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a queued job from a request. The topic is stored trimmed.
    pub fn new(request: &GenerationRequest) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            topic: request.topic.trim().to_string(),
            requested_recipe: request.recipe,
            resolved_recipe: None,
            recipe_decision: None,
            requested_duration_secs: request.duration_secs,
            resolution: request.resolution,
            status: JobStatus::Queued,
            planned_stages: Vec::new(),
            completed_stages: Vec::new(),
            current_stage: None,
            error: None,
            artifact: None,
            cancel_requested: false,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn requested_recipe(&self) -> RecipeSelection {
        self.requested_recipe
    }

    pub fn resolved_recipe(&self) -> Option<RecipeKind> {
        self.resolved_recipe
    }

    pub fn recipe_decision(&self) -> Option<&RecipeDecision> {
        self.recipe_decision.as_ref()
    }

    pub fn requested_duration_secs(&self) -> Option<f64> {
        self.requested_duration_secs
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn planned_stages(&self) -> &[StageKind] {
        &self.planned_stages
    }

    pub fn completed_stages(&self) -> &[StageKind] {
        &self.completed_stages
    }

    pub fn current_stage(&self) -> Option<StageKind> {
        self.current_stage
    }

    pub fn error(&self) -> Option<&ErrorRecord> {
        self.error.as_ref()
    }

    pub fn artifact(&self) -> Option<&ArtifactRef> {
        self.artifact.as_ref()
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Apply a lifecycle event through the state machine
    pub fn apply(&mut self, event: JobEvent) -> FactoryResult<JobStatus> {
        Ok(JobStateMachine::transition(self, event)?)
    }

    /// Flag the job for cancellation at its next stage boundary
    pub fn request_cancel(&mut self) -> FactoryResult<()> {
        if self.status.is_terminal() {
            return Err(FactoryError::InvalidState(format!(
                "job {} is already {}",
                self.id, self.status
            )));
        }
        self.cancel_requested = true;
        Ok(())
    }

    pub fn insert_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Artifact iff completed, error iff failed
    pub fn invariant_holds(&self) -> bool {
        let completed = self.status == JobStatus::Completed;
        let failed = self.status == JobStatus::Failed;
        completed == self.artifact.is_some() && failed == self.error.is_some()
    }

    /// Percentage of planned stages finished; 100 only once completed
    pub fn progress(&self) -> u8 {
        match self.status {
            JobStatus::Completed => 100,
            _ if self.planned_stages.is_empty() => 0,
            _ => {
                let done = self.completed_stages.len() * 100 / self.planned_stages.len();
                done.min(99) as u8
            }
        }
    }

    pub fn view(&self) -> JobView {
        JobView::from(self)
    }
}

/// Read-only snapshot handed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobView {
    pub id: JobId,
    pub topic: String,
    pub requested_recipe: RecipeSelection,
    pub resolved_recipe: Option<RecipeKind>,
    pub recipe_decision: Option<RecipeDecision>,
    pub requested_duration_secs: Option<f64>,
    pub resolution: Resolution,
    pub status: JobStatus,
    pub progress: u8,
    pub planned_stages: Vec<StageKind>,
    pub completed_stages: Vec<StageKind>,
    pub current_stage: Option<StageKind>,
    pub error: Option<ErrorRecord>,
    pub artifact: Option<ArtifactRef>,
    pub cancel_requested: bool,
    pub metadata: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            topic: job.topic.clone(),
            requested_recipe: job.requested_recipe,
            resolved_recipe: job.resolved_recipe,
            recipe_decision: job.recipe_decision.clone(),
            requested_duration_secs: job.requested_duration_secs,
            resolution: job.resolution,
            status: job.status,
            progress: job.progress(),
            planned_stages: job.planned_stages.clone(),
            completed_stages: job.completed_stages.clone(),
            current_stage: job.current_stage,
            error: job.error.clone(),
            artifact: job.artifact.clone(),
            cancel_requested: job.cancel_requested,
            metadata: job.metadata.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
