//! # Stage Collaborators
//!
//! Contracts for the engines that do the actual media work. The orchestration
//! core only sequences them; concrete text-to-speech, alignment, stock asset
//! and compositing implementations live outside this crate.
//!
//! Every collaborator reports failures as [`StageError`]: `Transient` and
//! `Timeout` are retried by the executor, `Permanent` is not. Files a
//! collaborator produces should be written under the `workdir` it is given,
//! which is the job's scratch directory.

pub mod director;

pub use director::{Director, KeywordDirector, RecipeChoice};

use crate::error::StageError;
use crate::models::{AudioArtifact, MediaArtifact, VideoArtifact, WordTiming};
use crate::recipes::{CaptionSpec, Recipe, RenderSpec, VoiceParams};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Script generation
#[async_trait]
pub trait ScriptWriter: Send + Sync {
    async fn write_script(&self, topic: &str, recipe: &Recipe) -> Result<String, StageError>;
}

/// Text-to-speech
#[async_trait]
pub trait VoiceSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceParams,
        workdir: &Path,
    ) -> Result<AudioArtifact, StageError>;
}

/// Word-level alignment of narration audio
#[async_trait]
pub trait Aligner: Send + Sync {
    async fn align(&self, audio: &AudioArtifact, workdir: &Path)
        -> Result<Vec<WordTiming>, StageError>;
}

/// Stock media retrieval. Falling back to a local pool is the fetcher's call.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(
        &self,
        query: &str,
        count: u32,
        workdir: &Path,
    ) -> Result<Vec<MediaArtifact>, StageError>;
}

/// Final render
#[async_trait]
pub trait Compositor: Send + Sync {
    async fn compose(
        &self,
        media: &[MediaArtifact],
        audio: &AudioArtifact,
        captions: &CaptionSpec,
        render: &RenderSpec,
        workdir: &Path,
    ) -> Result<VideoArtifact, StageError>;
}

/// Extends a rendered video to a long target duration
#[async_trait]
pub trait Looper: Send + Sync {
    async fn extend(
        &self,
        video: &VideoArtifact,
        target_duration_secs: f64,
        workdir: &Path,
    ) -> Result<VideoArtifact, StageError>;
}

/// Offline script writer that answers with a fixed template
#[derive(Debug, Clone, Default)]
pub struct TemplateScriptWriter;

#[async_trait]
impl ScriptWriter for TemplateScriptWriter {
    async fn write_script(&self, topic: &str, recipe: &Recipe) -> Result<String, StageError> {
        Ok(format!("This is a {} style video about: {topic}", recipe.kind))
    }
}

/// The full set of collaborators a scheduler dispatches to
#[derive(Clone)]
pub struct Collaborators {
    pub director: Arc<dyn Director>,
    pub script_writer: Arc<dyn ScriptWriter>,
    pub voice: Arc<dyn VoiceSynthesizer>,
    pub aligner: Arc<dyn Aligner>,
    pub assets: Arc<dyn AssetFetcher>,
    pub compositor: Arc<dyn Compositor>,
    pub looper: Arc<dyn Looper>,
}

impl Collaborators {
    /// Media collaborators with the keyword director and template script writer
    pub fn new(
        voice: Arc<dyn VoiceSynthesizer>,
        aligner: Arc<dyn Aligner>,
        assets: Arc<dyn AssetFetcher>,
        compositor: Arc<dyn Compositor>,
        looper: Arc<dyn Looper>,
    ) -> Self {
        Self {
            director: Arc::new(KeywordDirector::new()),
            script_writer: Arc::new(TemplateScriptWriter),
            voice,
            aligner,
            assets,
            compositor,
            looper,
        }
    }

    pub fn with_director(mut self, director: Arc<dyn Director>) -> Self {
        self.director = director;
        self
    }

    pub fn with_script_writer(mut self, script_writer: Arc<dyn ScriptWriter>) -> Self {
        self.script_writer = script_writer;
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("director", &self.director.name())
            .finish_non_exhaustive()
    }
}
