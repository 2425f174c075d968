use crate::models::{ArtifactRef, ErrorRecord, RecipeDecision};
use crate::orchestration::types::StageKind;
use crate::recipes::RecipeKind;
use serde::{Deserialize, Serialize};

/// Events that can trigger job state transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum JobEvent {
    /// Hand the job to the director
    BeginRecipeSelection,
    /// A concrete recipe is known and its stage graph planned
    RecipeResolved {
        recipe: RecipeKind,
        decision: RecipeDecision,
        planned_stages: Vec<StageKind>,
    },
    /// A stage has been dispatched
    StartStage(StageKind),
    /// The current stage succeeded
    CompleteStage(StageKind),
    /// Every stage succeeded and the deliverable is in place
    Complete(ArtifactRef),
    /// Unrecoverable failure
    Fail(ErrorRecord),
    /// Cancellation observed at a stage boundary
    Cancel,
}

impl JobEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::BeginRecipeSelection => "begin_recipe_selection",
            Self::RecipeResolved { .. } => "recipe_resolved",
            Self::StartStage(_) => "start_stage",
            Self::CompleteStage(_) => "complete_stage",
            Self::Complete(_) => "complete",
            Self::Fail(_) => "fail",
            Self::Cancel => "cancel",
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Fail(_) | Self::Cancel)
    }
}
