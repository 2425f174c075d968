//! Routes each stage kind to its collaborator.

use super::types::{StageAction, StageContext, StageKind, StageOutput, StageSpec};
use crate::collaborators::Collaborators;
use crate::error::StageError;
use async_trait::async_trait;
use tracing::debug;

/// [`StageAction`] backed by a [`Collaborators`] bundle
#[derive(Debug, Clone)]
pub struct CollaboratorDispatch {
    collaborators: Collaborators,
}

impl CollaboratorDispatch {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    async fn write_script(&self, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let script = self
            .collaborators
            .script_writer
            .write_script(&ctx.topic, &ctx.recipe)
            .await?;
        if script.trim().is_empty() {
            return Err(StageError::permanent("script writer returned an empty script"));
        }
        Ok(StageOutput::Script(script))
    }

    async fn synthesize(&self, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let text = match ctx.inputs.script() {
            Some(script) => script.to_string(),
            None if ctx.recipe.has_stage(StageKind::ScriptGeneration) => {
                return Err(StageError::missing_input("script"));
            }
            None => ctx.recipe.narration_text(&ctx.topic),
        };

        let voice = ctx.recipe.voice_params(0);
        debug!(
            job_id = %ctx.job_id,
            voice = %voice.voice,
            chars = text.len(),
            "Synthesizing narration"
        );
        let audio = self
            .collaborators
            .voice
            .synthesize(&text, &voice, &ctx.scratch_dir)
            .await?;
        Ok(StageOutput::Audio(audio))
    }

    async fn fetch_assets(&self, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let query = ctx.recipe.asset_query(&ctx.topic);
        let count = ctx.recipe.asset_count(ctx.duration_secs);
        debug!(job_id = %ctx.job_id, query = %query, count, "Fetching assets");

        let media = self
            .collaborators
            .assets
            .fetch(&query, count, &ctx.scratch_dir)
            .await?;
        if media.is_empty() {
            return Err(StageError::Permanent(format!(
                "no media assets available for query '{query}'"
            )));
        }
        Ok(StageOutput::Media(media))
    }

    async fn align(&self, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let audio = ctx
            .inputs
            .audio()
            .ok_or_else(|| StageError::missing_input("audio"))?;
        let timings = self
            .collaborators
            .aligner
            .align(audio, &ctx.scratch_dir)
            .await?;
        Ok(StageOutput::Timings(timings))
    }

    async fn compose(&self, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let media = ctx
            .inputs
            .media()
            .ok_or_else(|| StageError::missing_input("media"))?;
        let audio = ctx
            .inputs
            .audio()
            .ok_or_else(|| StageError::missing_input("audio"))?;
        let timings = ctx
            .inputs
            .timings()
            .ok_or_else(|| StageError::missing_input("word timings"))?;

        // A looped recipe renders one pass over its clips; looping stretches it
        let duration_secs = if ctx.recipe.has_stage(StageKind::Looping) {
            (media.len() as f64 * ctx.recipe.pacing.average_clip_secs()).min(ctx.duration_secs)
        } else {
            ctx.duration_secs
        };

        let captions = ctx.recipe.caption_spec(timings);
        let render = ctx.recipe.render_spec(ctx.resolution, duration_secs);
        let video = self
            .collaborators
            .compositor
            .compose(media, audio, &captions, &render, &ctx.scratch_dir)
            .await?;
        Ok(StageOutput::Video(video))
    }

    async fn extend(&self, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let video = ctx
            .inputs
            .video(StageKind::Composition)
            .ok_or_else(|| StageError::missing_input("composed video"))?;
        let looped = self
            .collaborators
            .looper
            .extend(video, ctx.duration_secs, &ctx.scratch_dir)
            .await?;
        Ok(StageOutput::Video(looped))
    }
}

#[async_trait]
impl StageAction for CollaboratorDispatch {
    async fn execute(
        &self,
        spec: &StageSpec,
        ctx: &StageContext,
    ) -> Result<StageOutput, StageError> {
        match spec.kind {
            StageKind::ScriptGeneration => self.write_script(ctx).await,
            StageKind::VoiceSynthesis => self.synthesize(ctx).await,
            StageKind::AssetFetch => self.fetch_assets(ctx).await,
            StageKind::Alignment => self.align(ctx).await,
            StageKind::Composition => self.compose(ctx).await,
            StageKind::Looping => self.extend(ctx).await,
        }
    }
}
