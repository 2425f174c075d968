//! Shared fixtures for scheduler integration tests.
//!
//! `MockMedia` stands in for every media collaborator at once. It writes real
//! files into the workdir it is handed, records each call, and can be scripted
//! to fail, panic, stall behind a gate or slow down per stage.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{Notify, Semaphore};
use video_factory::collaborators::{
    Aligner, AssetFetcher, Collaborators, Compositor, Director, Looper, RecipeChoice,
    VoiceSynthesizer,
};
use video_factory::models::{
    AudioArtifact, JobId, JobView, MediaArtifact, MediaKind, MediaSource, VideoArtifact,
    WordTiming,
};
use video_factory::recipes::{CaptionSpec, RecipeKind, RenderSpec, VoiceParams};
use video_factory::{FactoryConfig, PipelineScheduler, RecipeRegistry, StageError};

pub const VOICE: &str = "voice-synthesis";
pub const ALIGNMENT: &str = "alignment";
pub const ASSETS: &str = "asset-fetch";
pub const COMPOSITION: &str = "composition";
pub const LOOPING: &str = "looping";

/// Blocks a collaborator call until the test opens it
#[derive(Clone)]
pub struct Gate {
    entered: Arc<Notify>,
    release: Arc<Semaphore>,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Semaphore::new(0)),
        }
    }

    /// Resolves once a call has reached the gate
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.release.add_permits(1024);
    }

    async fn pass(&self) {
        self.entered.notify_one();
        let _ = self.release.acquire().await;
    }
}

#[derive(Default)]
pub struct MockMedia {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, VecDeque<StageError>>>,
    gates: Mutex<HashMap<&'static str, Gate>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
    panics: Mutex<Vec<&'static str>>,
    narration: Mutex<Vec<String>>,
    renders: Mutex<Vec<RenderSpec>>,
    loop_targets: Mutex<Vec<f64>>,
    missing_render: AtomicBool,
    compute_running: AtomicUsize,
    compute_peak: AtomicUsize,
}

impl MockMedia {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next `errors.len()` calls of `stage` with these errors
    pub fn fail(&self, stage: &'static str, errors: Vec<StageError>) {
        self.failures.lock().entry(stage).or_default().extend(errors);
    }

    pub fn gate(&self, stage: &'static str) -> Gate {
        let gate = Gate::new();
        self.gates.lock().insert(stage, gate.clone());
        gate
    }

    pub fn delay(&self, stage: &'static str, delay: Duration) {
        self.delays.lock().insert(stage, delay);
    }

    pub fn panic_in(&self, stage: &'static str) {
        self.panics.lock().push(stage);
    }

    /// Have the compositor report a video it never wrote
    pub fn skip_render_file(&self) {
        self.missing_render.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, stage: &str) -> usize {
        self.calls.lock().iter().filter(|call| *call == stage).count()
    }

    pub fn narration(&self) -> Vec<String> {
        self.narration.lock().clone()
    }

    pub fn renders(&self) -> Vec<RenderSpec> {
        self.renders.lock().clone()
    }

    pub fn loop_targets(&self) -> Vec<f64> {
        self.loop_targets.lock().clone()
    }

    /// Most compute-bound calls observed running at once
    pub fn compute_peak(&self) -> usize {
        self.compute_peak.load(Ordering::SeqCst)
    }

    async fn step(&self, stage: &'static str) -> Result<(), StageError> {
        self.calls.lock().push(stage.to_string());

        let gate = self.gates.lock().get(stage).cloned();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        let delay = self.delays.lock().get(stage).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.panics.lock().contains(&stage) {
            panic!("{stage} collaborator blew up");
        }

        let scripted = self.failures.lock().get_mut(stage).and_then(VecDeque::pop_front);
        match scripted {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn compute_step(&self, stage: &'static str) -> Result<(), StageError> {
        let running = self.compute_running.fetch_add(1, Ordering::SeqCst) + 1;
        self.compute_peak.fetch_max(running, Ordering::SeqCst);
        let result = self.step(stage).await;
        self.compute_running.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), StageError> {
    tokio::fs::write(path, bytes).await.map_err(StageError::from)
}

#[async_trait]
impl VoiceSynthesizer for MockMedia {
    async fn synthesize(
        &self,
        text: &str,
        _voice: &VoiceParams,
        workdir: &Path,
    ) -> Result<AudioArtifact, StageError> {
        self.step(VOICE).await?;
        self.narration.lock().push(text.to_string());
        let path = workdir.join("narration.mp3");
        write_file(&path, b"audio").await?;
        Ok(AudioArtifact {
            path,
            duration_secs: 12.0,
        })
    }
}

#[async_trait]
impl Aligner for MockMedia {
    async fn align(
        &self,
        _audio: &AudioArtifact,
        _workdir: &Path,
    ) -> Result<Vec<WordTiming>, StageError> {
        self.compute_step(ALIGNMENT).await?;
        Ok(vec![
            WordTiming {
                word: "hello".to_string(),
                start_secs: 0.0,
                end_secs: 0.4,
            },
            WordTiming {
                word: "world".to_string(),
                start_secs: 0.4,
                end_secs: 0.9,
            },
        ])
    }
}

#[async_trait]
impl AssetFetcher for MockMedia {
    async fn fetch(
        &self,
        _query: &str,
        count: u32,
        workdir: &Path,
    ) -> Result<Vec<MediaArtifact>, StageError> {
        self.step(ASSETS).await?;
        let mut media = Vec::new();
        for index in 0..count {
            let path = workdir.join(format!("asset_{index}.jpg"));
            write_file(&path, b"pixels").await?;
            media.push(MediaArtifact {
                path,
                kind: MediaKind::Image,
                source: MediaSource::LocalPool,
                duration_secs: None,
            });
        }
        Ok(media)
    }
}

#[async_trait]
impl Compositor for MockMedia {
    async fn compose(
        &self,
        _media: &[MediaArtifact],
        _audio: &AudioArtifact,
        _captions: &CaptionSpec,
        render: &RenderSpec,
        workdir: &Path,
    ) -> Result<VideoArtifact, StageError> {
        self.compute_step(COMPOSITION).await?;
        self.renders.lock().push(render.clone());
        let path = workdir.join("composition.mp4");
        if !self.missing_render.load(Ordering::SeqCst) {
            write_file(&path, b"frames").await?;
        }
        Ok(VideoArtifact {
            path,
            duration_secs: render.duration_secs,
            resolution: render.resolution,
        })
    }
}

#[async_trait]
impl Looper for MockMedia {
    async fn extend(
        &self,
        video: &VideoArtifact,
        target_duration_secs: f64,
        workdir: &Path,
    ) -> Result<VideoArtifact, StageError> {
        self.compute_step(LOOPING).await?;
        self.loop_targets.lock().push(target_duration_secs);
        let path = workdir.join("looped.mp4");
        write_file(&path, b"looped frames").await?;
        Ok(VideoArtifact {
            path,
            duration_secs: target_duration_secs,
            resolution: video.resolution,
        })
    }
}

/// Director with a canned answer
pub struct StaticDirector {
    answer: Result<RecipeChoice, StageError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticDirector {
    pub fn choosing(recipe: RecipeKind) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(RecipeChoice {
                recipe,
                reasoning: format!("scripted choice of {recipe}"),
            }),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(error: StageError) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(error),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    /// Answers only after `delay`
    pub fn stalling(recipe: RecipeKind, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(RecipeChoice {
                recipe,
                reasoning: "too late".to_string(),
            }),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Director for StaticDirector {
    async fn select_recipe(&self, _topic: &str) -> Result<RecipeChoice, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answer.clone()
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Temporary scratch/output roots plus a config pointing at them
pub struct TestEnv {
    pub scratch: TempDir,
    pub output: TempDir,
    pub config: FactoryConfig,
}

impl TestEnv {
    pub fn new() -> Self {
        let scratch = tempfile::tempdir().expect("scratch tempdir");
        let output = tempfile::tempdir().expect("output tempdir");

        let mut config = FactoryConfig::default();
        config.storage.scratch_root = scratch.path().to_path_buf();
        config.storage.output_root = output.path().to_path_buf();
        config.backoff.base_delay_ms = 1;
        config.backoff.max_delay_ms = 5;
        config.backoff.jitter_enabled = false;
        config.execution.director_timeout_ms = 200;
        config.scheduler.shutdown_timeout_ms = 1_000;

        Self {
            scratch,
            output,
            config,
        }
    }

    pub fn scratch_dir(&self, job_id: JobId) -> PathBuf {
        self.scratch.path().join(job_id.to_string())
    }

    pub fn scheduler(&self, media: &Arc<MockMedia>) -> PipelineScheduler {
        self.scheduler_with_director(media, None)
    }

    pub fn scheduler_with_director(
        &self,
        media: &Arc<MockMedia>,
        director: Option<Arc<dyn Director>>,
    ) -> PipelineScheduler {
        let registry = RecipeRegistry::from_config(&self.config).expect("registry");
        self.scheduler_with_registry(media, director, registry)
    }

    pub fn scheduler_with_registry(
        &self,
        media: &Arc<MockMedia>,
        director: Option<Arc<dyn Director>>,
        registry: RecipeRegistry,
    ) -> PipelineScheduler {
        let mut collaborators = Collaborators::new(
            media.clone(),
            media.clone(),
            media.clone(),
            media.clone(),
            media.clone(),
        );
        if let Some(director) = director {
            collaborators = collaborators.with_director(director);
        }
        PipelineScheduler::new(&self.config, Arc::new(registry), collaborators)
            .expect("scheduler")
    }
}

/// Artifact iff completed, error iff failed
pub fn assert_invariant(view: &JobView) {
    use video_factory::JobStatus;
    assert_eq!(
        view.status == JobStatus::Completed,
        view.artifact.is_some(),
        "artifact must be present iff completed: {view:?}"
    );
    assert_eq!(
        view.status == JobStatus::Failed,
        view.error.is_some(),
        "error must be present iff failed: {view:?}"
    );
}

/// Poll until the job is terminal, checking the invariant on every snapshot
pub async fn wait_for_terminal(scheduler: &PipelineScheduler, job_id: JobId) -> JobView {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let view = scheduler.get_status(job_id).expect("job exists");
        assert_invariant(&view);
        if view.status.is_terminal() {
            return view;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {job_id} did not finish: {view:?}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
