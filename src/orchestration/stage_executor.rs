//! # Stage Executor
//!
//! Runs a single stage attempt loop on behalf of the scheduler.
//!
//! ## Key Features
//!
//! - **Timeouts**: every attempt runs under the stage's wall-clock budget
//! - **Retries**: transient failures and timeouts are retried with backoff
//! - **Panic isolation**: a panicking action becomes a permanent failure
//! - **Metrics**: per-stage counters for runs, retries, timeouts and failures
//!
//! The executor holds no per-job state, so one instance serves every job. The
//! director call goes through the same loop via [`StageExecutor::run_with_policy`].

use super::backoff_calculator::BackoffCalculator;
use super::error_classifier::{ErrorClassifier, ErrorContext, StandardErrorClassifier};
use super::types::{
    StageAction, StageContext, StageFailure, StageOutput, StagePolicy, StageResult, StageSpec,
};
use crate::error::StageError;
use crate::events::{EventPublisher, LifecycleEventKind};
use crate::logging::log_stage_operation;
use crate::models::JobId;
use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

/// Counters for one stage label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMetrics {
    pub runs: u64,
    pub successes: u64,
    pub retries: u64,
    pub timeouts: u64,
    pub panics: u64,
    pub failures: u64,
}

pub struct StageExecutor {
    classifier: Arc<dyn ErrorClassifier>,
    events: EventPublisher,
    metrics: Arc<Mutex<HashMap<String, StageMetrics>>>,
}

impl StageExecutor {
    /// Executor using the standard classifier over `backoff`
    pub fn new(backoff: BackoffCalculator, events: EventPublisher) -> Self {
        Self::with_classifier(Arc::new(StandardErrorClassifier::new(backoff)), events)
    }

    pub fn with_classifier(classifier: Arc<dyn ErrorClassifier>, events: EventPublisher) -> Self {
        Self {
            classifier,
            events,
            metrics: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Execute a recipe stage through `action`
    #[instrument(skip(self, ctx, action), fields(job_id = %ctx.job_id, stage = %spec.kind))]
    pub async fn run(
        &self,
        spec: &StageSpec,
        ctx: &StageContext,
        action: &dyn StageAction,
    ) -> StageResult<StageOutput> {
        self.run_with_policy(ctx.job_id, spec.kind.name(), spec.policy, |_attempt| {
            action.execute(spec, ctx)
        })
        .await
    }

    /// Attempt loop shared by stages and the director.
    ///
    /// `attempt_fn` receives the 1-based attempt number and is invoked once per
    /// attempt.
    pub async fn run_with_policy<T, F, Fut>(
        &self,
        job_id: JobId,
        label: &str,
        policy: StagePolicy,
        mut attempt_fn: F,
    ) -> StageResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, StageError>>,
    {
        let started = Instant::now();
        let max_attempts = policy.max_attempts.max(1);
        self.record(label, |m| m.runs += 1);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let attempt_started = Instant::now();
            debug!(
                job_id = %job_id,
                stage = label,
                attempt,
                max_attempts,
                "Starting stage attempt"
            );

            let guarded = AssertUnwindSafe(attempt_fn(attempt)).catch_unwind();
            let outcome = match timeout(policy.timeout, guarded).await {
                Ok(Ok(result)) => result,
                Ok(Err(panic)) => {
                    self.record(label, |m| m.panics += 1);
                    Err(StageError::Permanent(format!(
                        "stage panicked: {}",
                        panic_message(panic.as_ref())
                    )))
                }
                Err(_) => Err(StageError::Timeout(policy.timeout)),
            };

            let error = match outcome {
                Ok(value) => {
                    self.record(label, |m| m.successes += 1);
                    let elapsed = started.elapsed();
                    log_stage_operation(
                        "completed",
                        job_id,
                        label,
                        Some("success"),
                        Some(attempt),
                        Some(elapsed),
                    );
                    return StageResult::Success {
                        value,
                        attempts: attempt,
                        elapsed,
                    };
                }
                Err(error) => error,
            };

            if matches!(error, StageError::Timeout(_)) {
                self.record(label, |m| m.timeouts += 1);
            }

            let context = ErrorContext {
                stage: label.to_string(),
                attempt_number: attempt,
                max_attempts,
                execution_duration: attempt_started.elapsed(),
            };
            let classification = self.classifier.classify_error(&error, &context);

            if classification.is_retryable {
                let delay = classification.retry_delay.unwrap_or(Duration::ZERO);
                self.record(label, |m| m.retries += 1);
                warn!(
                    job_id = %job_id,
                    stage = label,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Stage attempt failed, retrying"
                );
                self.events.publish(
                    job_id,
                    LifecycleEventKind::StageRetrying {
                        stage: label.to_string(),
                        attempt,
                        delay_ms: delay.as_millis() as u64,
                        error: error.to_string(),
                    },
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            self.record(label, |m| m.failures += 1);
            let elapsed = started.elapsed();
            log_stage_operation(
                "failed",
                job_id,
                label,
                Some(&classification.error_message),
                Some(attempt),
                Some(elapsed),
            );
            return StageResult::Failure(StageFailure {
                error,
                category: classification.error_category,
                attempts: attempt,
                elapsed,
            });
        }
    }

    /// Snapshot of the per-stage counters
    pub fn metrics(&self) -> HashMap<String, StageMetrics> {
        self.metrics.lock().clone()
    }

    pub fn metrics_for(&self, label: &str) -> StageMetrics {
        self.metrics.lock().get(label).cloned().unwrap_or_default()
    }

    fn record(&self, label: &str, update: impl FnOnce(&mut StageMetrics)) {
        let mut metrics = self.metrics.lock();
        update(metrics.entry(label.to_string()).or_default());
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
