//! # Orchestration Types
//!
//! Stage kinds, per-stage policies, the typed outputs stages exchange, and the
//! [`StageAction`] seam through which the executor reaches collaborators.

use super::error_classifier::ErrorCategory;
use crate::error::StageError;
use crate::models::{AudioArtifact, JobId, MediaArtifact, Resolution, VideoArtifact, WordTiming};
use crate::recipes::Recipe;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Kinds of pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    ScriptGeneration,
    VoiceSynthesis,
    AssetFetch,
    Alignment,
    Composition,
    Looping,
}

impl StageKind {
    pub const ALL: [StageKind; 6] = [
        StageKind::ScriptGeneration,
        StageKind::VoiceSynthesis,
        StageKind::AssetFetch,
        StageKind::Alignment,
        StageKind::Composition,
        StageKind::Looping,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ScriptGeneration => "script-generation",
            Self::VoiceSynthesis => "voice-synthesis",
            Self::AssetFetch => "asset-fetch",
            Self::Alignment => "alignment",
            Self::Composition => "composition",
            Self::Looping => "looping",
        }
    }

    /// Compute-bound stages hold a compute permit while they run
    pub fn is_compute_bound(&self) -> bool {
        matches!(self, Self::Alignment | Self::Composition | Self::Looping)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for StageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("Invalid stage kind: {s}"))
    }
}

/// Timeout and retry budget for one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
}

impl StagePolicy {
    /// `max_attempts` is raised to 1 when given as 0
    pub fn new(timeout: Duration, max_attempts: u32) -> Self {
        Self {
            timeout,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_secs(timeout_secs: u64, max_attempts: u32) -> Self {
        Self::new(Duration::from_secs(timeout_secs), max_attempts)
    }
}

/// One node of a recipe's stage template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
    pub kind: StageKind,
    pub depends_on: Vec<StageKind>,
    pub policy: StagePolicy,
}

impl StageSpec {
    pub fn new(kind: StageKind, policy: StagePolicy) -> Self {
        Self {
            kind,
            depends_on: Vec::new(),
            policy,
        }
    }

    pub fn after(mut self, dependencies: &[StageKind]) -> Self {
        self.depends_on.extend_from_slice(dependencies);
        self
    }
}

/// Typed payload produced by a successful stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StageOutput {
    Script(String),
    Audio(AudioArtifact),
    Timings(Vec<WordTiming>),
    Media(Vec<MediaArtifact>),
    Video(VideoArtifact),
}

impl StageOutput {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Script(_) => "script",
            Self::Audio(_) => "audio",
            Self::Timings(_) => "timings",
            Self::Media(_) => "media",
            Self::Video(_) => "video",
        }
    }
}

/// Outputs of a stage's declared dependencies
#[derive(Debug, Clone, Default)]
pub struct StageInputs {
    outputs: HashMap<StageKind, StageOutput>,
}

impl StageInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: StageKind, output: StageOutput) {
        self.outputs.insert(kind, output);
    }

    pub fn get(&self, kind: StageKind) -> Option<&StageOutput> {
        self.outputs.get(&kind)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn script(&self) -> Option<&str> {
        match self.get(StageKind::ScriptGeneration) {
            Some(StageOutput::Script(text)) => Some(text),
            _ => None,
        }
    }

    pub fn audio(&self) -> Option<&AudioArtifact> {
        match self.get(StageKind::VoiceSynthesis) {
            Some(StageOutput::Audio(audio)) => Some(audio),
            _ => None,
        }
    }

    pub fn timings(&self) -> Option<&[WordTiming]> {
        match self.get(StageKind::Alignment) {
            Some(StageOutput::Timings(timings)) => Some(timings),
            _ => None,
        }
    }

    pub fn media(&self) -> Option<&[MediaArtifact]> {
        match self.get(StageKind::AssetFetch) {
            Some(StageOutput::Media(media)) => Some(media),
            _ => None,
        }
    }

    pub fn video(&self, from: StageKind) -> Option<&VideoArtifact> {
        match self.get(from) {
            Some(StageOutput::Video(video)) => Some(video),
            _ => None,
        }
    }
}

/// Everything a stage action may read
#[derive(Debug, Clone)]
pub struct StageContext {
    pub job_id: JobId,
    pub topic: String,
    pub recipe: Arc<Recipe>,
    pub duration_secs: f64,
    pub resolution: Resolution,
    pub scratch_dir: PathBuf,
    pub inputs: StageInputs,
}

/// Normalized failure of a stage after the retry budget is spent
#[derive(Debug, Clone, PartialEq)]
pub struct StageFailure {
    pub error: StageError,
    pub category: ErrorCategory,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Normalized outcome of one stage execution
#[derive(Debug, Clone, PartialEq)]
pub enum StageResult<T = StageOutput> {
    Success {
        value: T,
        attempts: u32,
        elapsed: Duration,
    },
    Failure(StageFailure),
}

impl<T> StageResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. } => *attempts,
            Self::Failure(failure) => failure.attempts,
        }
    }

    pub fn into_result(self) -> Result<T, StageFailure> {
        match self {
            Self::Success { value, .. } => Ok(value),
            Self::Failure(failure) => Err(failure),
        }
    }
}

/// Performs the work of a stage kind
#[async_trait]
pub trait StageAction: Send + Sync {
    async fn execute(
        &self,
        spec: &StageSpec,
        ctx: &StageContext,
    ) -> Result<StageOutput, StageError>;
}
