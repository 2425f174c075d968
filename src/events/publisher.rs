use crate::constants::events as names;
use crate::models::{ArtifactRef, ErrorRecord, JobId, RecipeDecision};
use crate::orchestration::types::StageKind;
use crate::recipes::RecipeKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// What happened to a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEventKind {
    Submitted,
    RecipeSelected {
        recipe: RecipeKind,
        decision: RecipeDecision,
    },
    StageStarted {
        stage: StageKind,
    },
    StageRetrying {
        stage: String,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    StageCompleted {
        stage: StageKind,
        attempts: u32,
        elapsed_ms: u64,
    },
    Completed {
        artifact: ArtifactRef,
    },
    Failed {
        error: ErrorRecord,
    },
    Cancelled,
}

impl LifecycleEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Submitted => names::JOB_SUBMITTED,
            Self::RecipeSelected { .. } => names::JOB_RECIPE_SELECTED,
            Self::StageStarted { .. } => names::STAGE_STARTED,
            Self::StageRetrying { .. } => names::STAGE_RETRYING,
            Self::StageCompleted { .. } => names::STAGE_COMPLETED,
            Self::Completed { .. } => names::JOB_COMPLETED,
            Self::Failed { .. } => names::JOB_FAILED,
            Self::Cancelled => names::JOB_CANCELLED,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Failed { .. } | Self::Cancelled
        )
    }
}

/// Event that has been published
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobLifecycleEvent {
    pub job_id: JobId,
    pub kind: LifecycleEventKind,
    pub published_at: DateTime<Utc>,
}

/// Fan-out publisher for job lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<JobLifecycleEvent>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event for a job
    pub fn publish(&self, job_id: JobId, kind: LifecycleEventKind) {
        let event = JobLifecycleEvent {
            job_id,
            kind,
            published_at: Utc::now(),
        };
        trace!(job_id = %job_id, event = event.kind.name(), "Publishing lifecycle event");

        // send() only fails when nobody is subscribed, which is fine
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<JobLifecycleEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(crate::constants::defaults::EVENT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers() {
        let publisher = EventPublisher::new(4);
        assert_eq!(publisher.subscriber_count(), 0);
        publisher.publish(JobId::new(), LifecycleEventKind::Submitted);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events_in_order() {
        let publisher = EventPublisher::new(16);
        let mut receiver = publisher.subscribe();
        let job_id = JobId::new();

        publisher.publish(job_id, LifecycleEventKind::Submitted);
        publisher.publish(
            job_id,
            LifecycleEventKind::StageStarted {
                stage: StageKind::VoiceSynthesis,
            },
        );
        publisher.publish(job_id, LifecycleEventKind::Cancelled);

        let first = receiver.recv().await.unwrap();
        assert_eq!(first.job_id, job_id);
        assert_eq!(first.kind.name(), "job.submitted");
        assert_eq!(receiver.recv().await.unwrap().kind.name(), "stage.started");
        assert!(receiver.recv().await.unwrap().kind.is_terminal());
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let json = serde_json::to_value(LifecycleEventKind::StageRetrying {
            stage: "asset-fetch".to_string(),
            attempt: 1,
            delay_ms: 500,
            error: "transient failure: 503".to_string(),
        })
        .unwrap();
        assert_eq!(json["event"], "stage_retrying");
        assert_eq!(json["delay_ms"], 500);
    }
}
