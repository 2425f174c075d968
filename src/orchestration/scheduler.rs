//! # Pipeline Scheduler
//!
//! Entry point for job submission and the per-job execution loop.
//!
//! ## Overview
//!
//! `submit` validates a request, records a `queued` job and spawns its run on
//! the current Tokio runtime. Each run:
//!
//! 1. waits for an in-flight slot (`max_in_flight_jobs`)
//! 2. resolves the recipe, asking the director when the request said `auto`
//!    and falling back to ambient when the director can't be used
//! 3. walks the recipe's stage graph in declaration order, one stage at a
//!    time, holding a compute permit (`max_concurrent_jobs`) for
//!    compute-bound stages
//! 4. moves the deliverable out of the job's scratch space
//! 5. commits the terminal state after the scratch space is gone
//!
//! Cancellation is cooperative: the flag set by [`PipelineScheduler::cancel`]
//! is checked before the director, before each stage and before finalization.
//! A stage that is already running is allowed to finish.

use super::backoff_calculator::BackoffCalculator;
use super::error_classifier::ErrorCategory;
use super::job_finalizer::JobFinalizer;
use super::scratch::ScratchSpace;
use super::stage_dispatch::CollaboratorDispatch;
use super::stage_executor::{StageExecutor, StageMetrics};
use super::stage_graph::StageGraph;
use super::types::{
    StageAction, StageContext, StageInputs, StageKind, StageOutput, StagePolicy, StageResult,
};
use crate::collaborators::{Collaborators, Director};
use crate::config::{FactoryConfig, ValidationConfig};
use crate::constants::{
    FALLBACK_RECIPE, FINALIZATION_STAGE, RECIPE_SELECTION_STAGE, SCHEDULER_STAGE,
};
use crate::error::{FactoryError, FactoryResult, StageError};
use crate::events::{EventPublisher, JobLifecycleEvent, LifecycleEventKind};
use crate::logging::log_job_operation;
use crate::models::{
    ArtifactRef, ErrorRecord, GenerationRequest, Job, JobId, JobView, RecipeDecision,
};
use crate::recipes::{Recipe, RecipeSelection};
use crate::registry::RecipeRegistry;
use crate::state_machine::{JobEvent, JobStatus};
use crate::store::JobStore;
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, error, info, instrument, warn};

const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How a job run ended, before it is committed to the store
#[derive(Debug)]
enum JobOutcome {
    Completed(ArtifactRef),
    Failed(ErrorRecord),
    Cancelled,
}

/// Orchestrates job execution. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct PipelineScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    store: JobStore,
    registry: Arc<RecipeRegistry>,
    director: Arc<dyn Director>,
    action: Arc<dyn StageAction>,
    executor: StageExecutor,
    events: EventPublisher,
    finalizer: JobFinalizer,
    validation: ValidationConfig,
    director_policy: StagePolicy,
    scratch_root: PathBuf,
    /// Slots for jobs past `queued`
    admission: Semaphore,
    /// Permits for compute-bound stages
    compute: Semaphore,
    accepting: AtomicBool,
    shutdown_timeout: Duration,
}

impl PipelineScheduler {
    /// Scheduler dispatching every stage to `collaborators`
    pub fn new(
        config: &FactoryConfig,
        registry: Arc<RecipeRegistry>,
        collaborators: Collaborators,
    ) -> FactoryResult<Self> {
        let director = Arc::clone(&collaborators.director);
        let action: Arc<dyn StageAction> = Arc::new(CollaboratorDispatch::new(collaborators));
        Self::with_components(config, registry, director, action)
    }

    /// Scheduler with a custom stage action in place of collaborator dispatch
    pub fn with_components(
        config: &FactoryConfig,
        registry: Arc<RecipeRegistry>,
        director: Arc<dyn Director>,
        action: Arc<dyn StageAction>,
    ) -> FactoryResult<Self> {
        config.validate()?;
        if !registry.contains(FALLBACK_RECIPE) {
            return Err(FactoryError::ConfigurationError(format!(
                "fallback recipe {FALLBACK_RECIPE} must be registered"
            )));
        }

        let events = EventPublisher::new(config.scheduler.event_channel_capacity);
        let executor = StageExecutor::new(
            BackoffCalculator::new(config.backoff.clone()),
            events.clone(),
        );

        let stats = registry.stats();
        info!(
            recipes = ?stats.recipes,
            total_stages = stats.total_stages,
            max_concurrent_jobs = config.scheduler.max_concurrent_jobs,
            max_in_flight_jobs = config.scheduler.max_in_flight_jobs,
            director = director.name(),
            "🚀 Pipeline scheduler initialized"
        );

        Ok(Self {
            inner: Arc::new(SchedulerInner {
                store: JobStore::new(),
                registry,
                director,
                action,
                executor,
                events,
                finalizer: JobFinalizer::new(&config.storage.output_root),
                validation: config.validation.clone(),
                director_policy: config.execution.director_policy(),
                scratch_root: config.storage.scratch_root.clone(),
                admission: Semaphore::new(config.scheduler.max_in_flight_jobs),
                compute: Semaphore::new(config.scheduler.max_concurrent_jobs),
                accepting: AtomicBool::new(true),
                shutdown_timeout: config.scheduler.shutdown_timeout(),
            }),
        })
    }

    /// Accept a request and start it in the background.
    ///
    /// Must be called from within a Tokio runtime. Fails only for malformed
    /// requests, unknown or incompatible explicit recipes, or after shutdown.
    pub fn submit(&self, request: GenerationRequest) -> FactoryResult<JobId> {
        if !self.inner.accepting.load(Ordering::SeqCst) {
            return Err(FactoryError::ShuttingDown);
        }

        request.validate(&self.inner.validation)?;
        if let RecipeSelection::Fixed(kind) = request.recipe {
            let recipe = self
                .inner
                .registry
                .get(kind)
                .ok_or_else(|| FactoryError::UnknownRecipe(kind.name().to_string()))?;
            recipe.check_compatibility(self.inner.job_duration(&recipe, request.duration_secs))?;
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            FactoryError::Internal("submit must be called from within a Tokio runtime".to_string())
        })?;

        let job_id = self.inner.store.create(Job::new(&request))?;
        // a shutdown sweep may have run between the check above and create
        if !self.inner.accepting.load(Ordering::SeqCst) {
            if let Err(e) = self.inner.store.remove(job_id) {
                debug!(job_id = %job_id, error = %e, "Withdrawn job was already gone");
            }
            return Err(FactoryError::ShuttingDown);
        }

        self.inner.events.publish(job_id, LifecycleEventKind::Submitted);
        log_job_operation(
            "submitted",
            job_id,
            Some(JobStatus::Queued.as_str()),
            Some(&format!("recipe={}", request.recipe)),
        );

        let inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            inner.run_job(job_id).await;
        });

        Ok(job_id)
    }

    pub fn get_status(&self, job_id: JobId) -> FactoryResult<JobView> {
        self.inner.store.view(job_id)
    }

    /// The deliverable of a completed job
    pub fn get_artifact(&self, job_id: JobId) -> FactoryResult<ArtifactRef> {
        let job = self.inner.store.get(job_id)?;
        match job.artifact() {
            Some(artifact) if job.status() == JobStatus::Completed => Ok(artifact.clone()),
            _ => Err(FactoryError::NotReady {
                job_id,
                status: job.status(),
            }),
        }
    }

    /// Request cancellation at the job's next stage boundary
    pub fn cancel(&self, job_id: JobId) -> FactoryResult<()> {
        let job = self.inner.store.update(job_id, Job::request_cancel)?;
        log_job_operation(
            "cancel_requested",
            job_id,
            Some(job.status().as_str()),
            job.current_stage().map(|stage| stage.name()),
        );
        Ok(())
    }

    /// Every job, oldest first
    pub fn list_jobs(&self) -> Vec<JobView> {
        self.inner.store.list().iter().map(Job::view).collect()
    }

    /// Remove a terminal job's record
    pub fn purge(&self, job_id: JobId) -> FactoryResult<JobView> {
        match self
            .inner
            .store
            .remove_if(job_id, |job| job.status().is_terminal())
        {
            Some(job) => {
                debug!(job_id = %job_id, status = %job.status(), "Purged job record");
                Ok(job.view())
            }
            None if self.inner.store.contains(job_id) => Err(FactoryError::InvalidState(format!(
                "job {job_id} is still active and cannot be purged"
            ))),
            None => Err(FactoryError::NotFound(job_id)),
        }
    }

    /// Drop terminal jobs last updated at least `age` ago. Returns how many went.
    pub fn evict_terminal_older_than(&self, age: Duration) -> FactoryResult<usize> {
        let age = chrono::Duration::from_std(age)
            .map_err(|_| {
                FactoryError::validation(format!("eviction age {age:?} is out of range"))
            })?;
        let cutoff = Utc::now() - age;
        let is_stale = |job: &Job| job.status().is_terminal() && job.updated_at() <= cutoff;

        let evicted = self
            .inner
            .store
            .list()
            .iter()
            .filter(|job| is_stale(job))
            .filter_map(|job| self.inner.store.remove_if(job.id(), is_stale))
            .count();

        if evicted > 0 {
            info!(evicted, cutoff = %cutoff, "🧹 Evicted terminal jobs");
        }
        Ok(evicted)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobLifecycleEvent> {
        self.inner.events.subscribe()
    }

    /// Jobs not yet in a terminal state
    pub fn active_jobs(&self) -> usize {
        self.inner
            .store
            .list()
            .iter()
            .filter(|job| !job.status().is_terminal())
            .count()
    }

    pub fn is_accepting(&self) -> bool {
        self.inner.accepting.load(Ordering::SeqCst)
    }

    /// Configured grace period for [`PipelineScheduler::shutdown`]
    pub fn shutdown_timeout(&self) -> Duration {
        self.inner.shutdown_timeout
    }

    /// Stop accepting jobs, cancel everything active and wait for the runs to
    /// settle. Returns `Timeout` if jobs are still active after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> FactoryResult<()> {
        self.inner.accepting.store(false, Ordering::SeqCst);
        info!("🛑 Scheduler shutting down");

        for job in self.inner.store.list() {
            if !job.status().is_terminal() {
                // the run may reach a terminal state first
                if let Err(e) = self.inner.store.update(job.id(), Job::request_cancel) {
                    debug!(job_id = %job.id(), error = %e, "Skipped cancellation during shutdown");
                }
            }
        }

        let deadline = Instant::now() + timeout;
        loop {
            let active = self.active_jobs();
            if active == 0 {
                info!("✅ Scheduler shutdown complete");
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!(
                    active,
                    timeout_ms = timeout.as_millis() as u64,
                    "Shutdown timed out with active jobs"
                );
                return Err(FactoryError::Timeout(format!(
                    "{active} job(s) still active after {timeout:?}"
                )));
            }
            tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
        }
    }

    /// Per-stage execution counters
    pub fn executor_metrics(&self) -> HashMap<String, StageMetrics> {
        self.inner.executor.metrics()
    }

    pub fn registry(&self) -> &RecipeRegistry {
        &self.inner.registry
    }

    pub fn store(&self) -> &JobStore {
        &self.inner.store
    }
}

impl std::fmt::Debug for PipelineScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineScheduler")
            .field("jobs", &self.inner.store.len())
            .field("recipes", &self.inner.registry.list_available())
            .field("director", &self.inner.director.name())
            .field("accepting", &self.is_accepting())
            .finish()
    }
}

impl SchedulerInner {
    #[instrument(skip_all, fields(job_id = %job_id))]
    async fn run_job(self: Arc<Self>, job_id: JobId) {
        let _slot = match self.admission.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                self.commit(
                    job_id,
                    JobOutcome::Failed(ErrorRecord::new(
                        SCHEDULER_STAGE,
                        "admission pool closed",
                        ErrorCategory::Permanent,
                        0,
                    )),
                );
                return;
            }
        };

        let mut scratch = None;
        let outcome = match self.drive(job_id, &mut scratch).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Job run aborted by scheduler error");
                JobOutcome::Failed(ErrorRecord::new(
                    SCHEDULER_STAGE,
                    e.to_string(),
                    ErrorCategory::Permanent,
                    0,
                ))
            }
        };

        if let Some(space) = scratch {
            if let Err(e) = space.release().await {
                warn!(job_id = %job_id, error = %e, "Failed to release scratch space");
            }
        }

        self.commit(job_id, outcome);
    }

    /// Everything between admission and the terminal commit
    async fn drive(
        &self,
        job_id: JobId,
        scratch: &mut Option<ScratchSpace>,
    ) -> FactoryResult<JobOutcome> {
        let job = self.store.get(job_id)?;
        if job.cancel_requested() {
            return Ok(JobOutcome::Cancelled);
        }

        let (recipe, decision) = match job.requested_recipe() {
            RecipeSelection::Fixed(kind) => {
                let recipe = self
                    .registry
                    .get(kind)
                    .ok_or_else(|| FactoryError::UnknownRecipe(kind.name().to_string()))?;
                (recipe, RecipeDecision::Requested)
            }
            RecipeSelection::Auto => {
                self.store.update(job_id, |job| {
                    job.apply(JobEvent::BeginRecipeSelection).map(|_| ())
                })?;
                self.select_recipe(job_id, job.topic(), job.requested_duration_secs())
                    .await?
            }
        };

        let graph = StageGraph::from_recipe(&recipe)?;
        let duration_secs = self.job_duration(&recipe, job.requested_duration_secs());
        let decision_value = serde_json::to_value(&decision).unwrap_or_default();
        self.store.update(job_id, |job| {
            job.insert_metadata("recipe_decision", decision_value);
            job.insert_metadata("duration_secs", serde_json::json!(duration_secs));
            job.apply(JobEvent::RecipeResolved {
                recipe: recipe.kind,
                decision: decision.clone(),
                planned_stages: graph.kinds(),
            })
            .map(|_| ())
        })?;
        self.events.publish(
            job_id,
            LifecycleEventKind::RecipeSelected {
                recipe: recipe.kind,
                decision,
            },
        );
        log_job_operation(
            "recipe_resolved",
            job_id,
            Some(JobStatus::Running.as_str()),
            Some(recipe.name()),
        );

        let space: &ScratchSpace = scratch.insert(
            ScratchSpace::acquire(&self.scratch_root, job_id)
                .await
                .map_err(|e| {
                    FactoryError::Internal(format!("failed to acquire scratch space: {e}"))
                })?,
        );

        let mut pool: HashMap<StageKind, StageOutput> = HashMap::new();
        let mut completed: Vec<StageKind> = Vec::with_capacity(graph.len());

        while let Some(spec) = graph.next_runnable(&completed) {
            if self.cancel_requested(job_id)? {
                return Ok(JobOutcome::Cancelled);
            }

            self.store
                .update(job_id, |job| job.apply(JobEvent::StartStage(spec.kind)).map(|_| ()))?;
            self.events
                .publish(job_id, LifecycleEventKind::StageStarted { stage: spec.kind });

            let mut inputs = StageInputs::new();
            for dependency in &spec.depends_on {
                if let Some(output) = pool.get(dependency) {
                    inputs.insert(*dependency, output.clone());
                }
            }
            let ctx = StageContext {
                job_id,
                topic: job.topic().to_string(),
                recipe: Arc::clone(&recipe),
                duration_secs,
                resolution: job.resolution(),
                scratch_dir: space.path().to_path_buf(),
                inputs,
            };

            let permit = if spec.kind.is_compute_bound() {
                Some(self.compute.acquire().await.map_err(|_| {
                    FactoryError::Internal("compute pool closed".to_string())
                })?)
            } else {
                None
            };
            let result = self.executor.run(spec, &ctx, self.action.as_ref()).await;
            drop(permit);

            match result {
                StageResult::Success {
                    value,
                    attempts,
                    elapsed,
                } => {
                    self.store.update(job_id, |job| {
                        job.apply(JobEvent::CompleteStage(spec.kind)).map(|_| ())
                    })?;
                    self.events.publish(
                        job_id,
                        LifecycleEventKind::StageCompleted {
                            stage: spec.kind,
                            attempts,
                            elapsed_ms: elapsed.as_millis() as u64,
                        },
                    );
                    pool.insert(spec.kind, value);
                    completed.push(spec.kind);
                }
                StageResult::Failure(failure) => {
                    return Ok(JobOutcome::Failed(ErrorRecord::new(
                        spec.kind.name(),
                        failure.error.to_string(),
                        failure.category,
                        failure.attempts,
                    )));
                }
            }
        }

        if !graph.is_complete(&completed) {
            return Err(FactoryError::Internal(format!(
                "stage graph for {} stalled after {completed:?}",
                recipe.name()
            )));
        }

        if self.cancel_requested(job_id)? {
            return Ok(JobOutcome::Cancelled);
        }

        let Some(video) = JobFinalizer::select_deliverable(&graph, &pool) else {
            return Ok(JobOutcome::Failed(ErrorRecord::new(
                FINALIZATION_STAGE,
                "no stage produced a video deliverable",
                ErrorCategory::Permanent,
                1,
            )));
        };

        match self.finalizer.finalize(job_id, video, space).await {
            Ok(artifact) => Ok(JobOutcome::Completed(artifact)),
            Err(e) => {
                let error = StageError::from(e);
                Ok(JobOutcome::Failed(ErrorRecord::new(
                    FINALIZATION_STAGE,
                    error.to_string(),
                    ErrorCategory::from(&error),
                    1,
                )))
            }
        }
    }

    /// Ask the director for a recipe, falling back when its answer is unusable
    async fn select_recipe(
        &self,
        job_id: JobId,
        topic: &str,
        requested_duration_secs: Option<f64>,
    ) -> FactoryResult<(Arc<Recipe>, RecipeDecision)> {
        let result = self
            .executor
            .run_with_policy(job_id, RECIPE_SELECTION_STAGE, self.director_policy, |_attempt| {
                self.director.select_recipe(topic)
            })
            .await;

        let reason = match result.into_result() {
            Ok(choice) => match self.registry.get(choice.recipe) {
                Some(recipe) => {
                    let duration_secs = self.job_duration(&recipe, requested_duration_secs);
                    match recipe.check_compatibility(duration_secs) {
                        Ok(()) => {
                            info!(
                                job_id = %job_id,
                                recipe = recipe.name(),
                                reasoning = %choice.reasoning,
                                "🎯 Director selected recipe"
                            );
                            return Ok((
                                recipe,
                                RecipeDecision::Director {
                                    reasoning: choice.reasoning,
                                },
                            ));
                        }
                        Err(e) => format!("director chose {}: {e}", choice.recipe),
                    }
                }
                None => format!("director chose unregistered recipe {}", choice.recipe),
            },
            Err(failure) => format!(
                "director failed after {} attempt(s): {}",
                failure.attempts, failure.error
            ),
        };

        warn!(
            job_id = %job_id,
            reason = %reason,
            fallback = %FALLBACK_RECIPE,
            "Falling back to default recipe"
        );
        let recipe = self
            .registry
            .get(FALLBACK_RECIPE)
            .ok_or_else(|| FactoryError::UnknownRecipe(FALLBACK_RECIPE.name().to_string()))?;
        Ok((recipe, RecipeDecision::Fallback { reason }))
    }

    /// Requested duration, else the recipe default capped at the configured maximum
    fn job_duration(&self, recipe: &Recipe, requested_duration_secs: Option<f64>) -> f64 {
        recipe
            .effective_duration(requested_duration_secs)
            .min(self.validation.max_duration_secs)
    }

    fn cancel_requested(&self, job_id: JobId) -> FactoryResult<bool> {
        Ok(self.store.get(job_id)?.cancel_requested())
    }

    /// Commit the terminal transition and announce it
    fn commit(&self, job_id: JobId, outcome: JobOutcome) {
        let (event, announcement) = match outcome {
            JobOutcome::Completed(artifact) => (
                JobEvent::Complete(artifact.clone()),
                LifecycleEventKind::Completed { artifact },
            ),
            JobOutcome::Failed(record) => (
                JobEvent::Fail(record.clone()),
                LifecycleEventKind::Failed { error: record },
            ),
            JobOutcome::Cancelled => (JobEvent::Cancel, LifecycleEventKind::Cancelled),
        };

        match self.store.update(job_id, |job| job.apply(event).map(|_| ())) {
            Ok(job) => {
                let details = match &announcement {
                    LifecycleEventKind::Completed { artifact } => {
                        Some(artifact.path.display().to_string())
                    }
                    LifecycleEventKind::Failed { error } => {
                        Some(format!("{}: {}", error.stage, error.cause))
                    }
                    _ => None,
                };
                log_job_operation(
                    "finished",
                    job_id,
                    Some(job.status().as_str()),
                    details.as_deref(),
                );
                self.events.publish(job_id, announcement);
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Failed to commit terminal job state");
                // keep the job from being stranded in a non-terminal state
                let record =
                    ErrorRecord::new(SCHEDULER_STAGE, e.to_string(), ErrorCategory::Permanent, 0);
                let fallback = record.clone();
                if self
                    .store
                    .update(job_id, |job| job.apply(JobEvent::Fail(record)).map(|_| ()))
                    .is_ok()
                {
                    self.events
                        .publish(job_id, LifecycleEventKind::Failed { error: fallback });
                }
            }
        }
    }
}
