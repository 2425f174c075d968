use super::errors::{guard_failed, StateMachineError, StateMachineResult};
use super::events::JobEvent;
use super::states::JobStatus;
use crate::models::Job;
use tracing::debug;

/// Transition rules for the job lifecycle.
///
/// The machine is stateless; it validates an event against a job and applies
/// the resulting field changes. The job store is the only caller that commits
/// the mutated record.
pub struct JobStateMachine;

impl JobStateMachine {
    /// Validate `event` against `job` and apply it in place
    pub fn transition(job: &mut Job, event: JobEvent) -> StateMachineResult<JobStatus> {
        let current_state = job.status;
        let target_state = Self::determine_target_state(current_state, &event)?;
        Self::check_guards(job, &event)?;

        debug!(
            job_id = %job.id,
            from_state = %current_state,
            to_state = %target_state,
            event = event.event_type(),
            "Job state transition"
        );

        match event {
            JobEvent::BeginRecipeSelection => {}
            JobEvent::RecipeResolved {
                recipe,
                decision,
                planned_stages,
            } => {
                job.resolved_recipe = Some(recipe);
                job.recipe_decision = Some(decision);
                job.planned_stages = planned_stages;
            }
            JobEvent::StartStage(kind) => {
                job.current_stage = Some(kind);
            }
            JobEvent::CompleteStage(kind) => {
                job.completed_stages.push(kind);
                job.current_stage = None;
            }
            JobEvent::Complete(artifact) => {
                job.artifact = Some(artifact);
                job.current_stage = None;
            }
            JobEvent::Fail(record) => {
                job.error = Some(record);
                job.current_stage = None;
            }
            JobEvent::Cancel => {
                job.current_stage = None;
            }
        }

        job.status = target_state;
        Ok(target_state)
    }

    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: JobStatus,
        event: &JobEvent,
    ) -> StateMachineResult<JobStatus> {
        let target = match (current_state, event) {
            // Recipe resolution
            (JobStatus::Queued, JobEvent::BeginRecipeSelection) => JobStatus::SelectingRecipe,
            (JobStatus::Queued, JobEvent::RecipeResolved { .. }) => JobStatus::Running,
            (JobStatus::SelectingRecipe, JobEvent::RecipeResolved { .. }) => JobStatus::Running,

            // Stage progress
            (JobStatus::Running, JobEvent::StartStage(_)) => JobStatus::Running,
            (JobStatus::Running, JobEvent::CompleteStage(_)) => JobStatus::Running,

            // Completion
            (JobStatus::Running, JobEvent::Complete(_)) => JobStatus::Completed,

            // Failure and cancellation from any non-terminal state
            (state, JobEvent::Fail(_)) if !state.is_terminal() => JobStatus::Failed,
            (state, JobEvent::Cancel) if !state.is_terminal() => JobStatus::Cancelled,

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                });
            }
        };

        Ok(target)
    }

    /// Check guard conditions for a transition
    fn check_guards(job: &Job, event: &JobEvent) -> StateMachineResult<()> {
        match event {
            JobEvent::RecipeResolved { planned_stages, .. } if planned_stages.is_empty() => {
                Err(guard_failed("resolved recipe has no stages"))
            }
            JobEvent::StartStage(kind) => {
                if job.current_stage.is_some() {
                    return Err(guard_failed(format!(
                        "cannot start {kind} while another stage is in flight"
                    )));
                }
                if !job.planned_stages.contains(kind) {
                    return Err(guard_failed(format!("{kind} is not part of the plan")));
                }
                if job.completed_stages.contains(kind) {
                    return Err(guard_failed(format!("{kind} has already completed")));
                }
                Ok(())
            }
            JobEvent::CompleteStage(kind) => {
                if job.current_stage != Some(*kind) {
                    return Err(guard_failed(format!("{kind} is not the current stage")));
                }
                Ok(())
            }
            JobEvent::Complete(_) => {
                let pending = job
                    .planned_stages
                    .iter()
                    .filter(|kind| !job.completed_stages.contains(kind))
                    .count();
                if pending > 0 {
                    return Err(guard_failed(format!(
                        "{pending} planned stage(s) have not completed"
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArtifactRef, ErrorRecord, GenerationRequest, RecipeDecision};
    use crate::orchestration::error_classifier::ErrorCategory;
    use crate::orchestration::types::StageKind;
    use crate::recipes::RecipeKind;

    fn queued_job() -> Job {
        let request = GenerationRequest::parse("ocean waves", "ambient", None, "1080p").unwrap();
        Job::new(&request)
    }

    fn resolved(stages: Vec<StageKind>) -> JobEvent {
        JobEvent::RecipeResolved {
            recipe: RecipeKind::Ambient,
            decision: RecipeDecision::Requested,
            planned_stages: stages,
        }
    }

    #[test]
    fn test_valid_transitions() {
        assert_eq!(
            JobStateMachine::determine_target_state(
                JobStatus::Queued,
                &JobEvent::BeginRecipeSelection
            )
            .unwrap(),
            JobStatus::SelectingRecipe
        );
        assert_eq!(
            JobStateMachine::determine_target_state(
                JobStatus::SelectingRecipe,
                &resolved(vec![StageKind::VoiceSynthesis])
            )
            .unwrap(),
            JobStatus::Running
        );
        assert_eq!(
            JobStateMachine::determine_target_state(JobStatus::Queued, &JobEvent::Cancel).unwrap(),
            JobStatus::Cancelled
        );
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(JobStateMachine::determine_target_state(
            JobStatus::Completed,
            &JobEvent::Cancel
        )
        .is_err());
        assert!(JobStateMachine::determine_target_state(
            JobStatus::Queued,
            &JobEvent::StartStage(StageKind::AssetFetch)
        )
        .is_err());
        assert!(JobStateMachine::determine_target_state(
            JobStatus::Running,
            &JobEvent::BeginRecipeSelection
        )
        .is_err());
    }

    #[test]
    fn test_stage_guards() {
        let mut job = queued_job();
        JobStateMachine::transition(
            &mut job,
            resolved(vec![StageKind::VoiceSynthesis, StageKind::AssetFetch]),
        )
        .unwrap();

        JobStateMachine::transition(&mut job, JobEvent::StartStage(StageKind::VoiceSynthesis))
            .unwrap();
        assert_eq!(job.current_stage, Some(StageKind::VoiceSynthesis));

        // Only one stage in flight at a time
        let err = JobStateMachine::transition(&mut job, JobEvent::StartStage(StageKind::AssetFetch))
            .unwrap_err();
        assert!(matches!(err, StateMachineError::GuardFailed { .. }));

        // Completing a stage that is not current is rejected
        assert!(JobStateMachine::transition(
            &mut job,
            JobEvent::CompleteStage(StageKind::AssetFetch)
        )
        .is_err());

        JobStateMachine::transition(&mut job, JobEvent::CompleteStage(StageKind::VoiceSynthesis))
            .unwrap();
        assert_eq!(job.completed_stages, vec![StageKind::VoiceSynthesis]);
        assert!(job.current_stage.is_none());

        // Unplanned stages cannot start
        assert!(JobStateMachine::transition(&mut job, JobEvent::StartStage(StageKind::Looping))
            .is_err());
    }

    #[test]
    fn test_complete_requires_all_planned_stages() {
        let mut job = queued_job();
        JobStateMachine::transition(&mut job, resolved(vec![StageKind::VoiceSynthesis])).unwrap();

        let artifact = ArtifactRef::video("output/video.mp4", Some(60.0));
        assert!(
            JobStateMachine::transition(&mut job, JobEvent::Complete(artifact.clone())).is_err()
        );
        assert!(job.artifact.is_none());

        JobStateMachine::transition(&mut job, JobEvent::StartStage(StageKind::VoiceSynthesis))
            .unwrap();
        JobStateMachine::transition(&mut job, JobEvent::CompleteStage(StageKind::VoiceSynthesis))
            .unwrap();
        let status = JobStateMachine::transition(&mut job, JobEvent::Complete(artifact)).unwrap();
        assert_eq!(status, JobStatus::Completed);
        assert!(job.artifact.is_some());
    }

    #[test]
    fn test_fail_records_error_and_clears_current_stage() {
        let mut job = queued_job();
        JobStateMachine::transition(&mut job, resolved(vec![StageKind::VoiceSynthesis])).unwrap();
        JobStateMachine::transition(&mut job, JobEvent::StartStage(StageKind::VoiceSynthesis))
            .unwrap();

        let record = ErrorRecord::new("voice-synthesis", "tts down", ErrorCategory::Transient, 3);
        JobStateMachine::transition(&mut job, JobEvent::Fail(record)).unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.current_stage.is_none());
        assert_eq!(job.error.as_ref().unwrap().stage, "voice-synthesis");
    }
}
