//! # Job Finalizer
//!
//! Picks the deliverable out of a finished stage pool and moves it from the
//! job's scratch space into the output directory.
//!
//! The deliverable is the video produced by the last video-producing stage in
//! declaration order (composition, or looping when the recipe has it). A video
//! that a collaborator already wrote outside the scratch space is referenced
//! in place.

use super::scratch::ScratchSpace;
use super::stage_graph::StageGraph;
use super::types::{StageKind, StageOutput};
use crate::models::{ArtifactRef, JobId, VideoArtifact};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct JobFinalizer {
    output_root: PathBuf,
}

impl JobFinalizer {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    pub fn select_deliverable<'a>(
        graph: &StageGraph,
        outputs: &'a HashMap<StageKind, StageOutput>,
    ) -> Option<&'a VideoArtifact> {
        graph
            .kinds()
            .into_iter()
            .rev()
            .find_map(|kind| match outputs.get(&kind) {
                Some(StageOutput::Video(video)) => Some(video),
                _ => None,
            })
    }

    /// Move `video` to its final location and return the artifact reference
    pub async fn finalize(
        &self,
        job_id: JobId,
        video: &VideoArtifact,
        scratch: &ScratchSpace,
    ) -> io::Result<ArtifactRef> {
        let source = video.path();
        if tokio::fs::metadata(source).await.is_err() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("deliverable {} does not exist", source.display()),
            ));
        }

        if !scratch.contains(source) {
            debug!(
                job_id = %job_id,
                path = %source.display(),
                "Deliverable already outside scratch space"
            );
            return Ok(ArtifactRef::video(source, Some(video.duration_secs)));
        }

        tokio::fs::create_dir_all(&self.output_root).await?;
        let extension = source
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("mp4");
        let destination = self.output_root.join(format!("video_{job_id}.{extension}"));

        if tokio::fs::rename(source, &destination).await.is_err() {
            // rename cannot cross filesystems
            tokio::fs::copy(source, &destination).await?;
            tokio::fs::remove_file(source).await?;
        }

        info!(job_id = %job_id, path = %destination.display(), "📦 Deliverable finalized");
        Ok(ArtifactRef::video(destination, Some(video.duration_secs)))
    }
}
