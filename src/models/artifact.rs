//! Artifacts exchanged between stages and handed back to callers.

use super::Resolution;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Location of a finished deliverable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub path: PathBuf,
    pub media_type: String,
    pub duration_secs: Option<f64>,
}

impl ArtifactRef {
    pub fn video(path: impl Into<PathBuf>, duration_secs: Option<f64>) -> Self {
        Self {
            path: path.into(),
            media_type: "video/mp4".to_string(),
            duration_secs,
        }
    }
}

/// Narration audio produced by voice synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub duration_secs: f64,
}

/// A single aligned word, used to drive captions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start_secs: f64,
    pub end_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

/// Where a media asset came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum MediaSource {
    Provider(String),
    LocalPool,
}

/// Visual material fetched for composition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaArtifact {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub source: MediaSource,
    pub duration_secs: Option<f64>,
}

/// Rendered video, either the composition output or its looped extension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoArtifact {
    pub path: PathBuf,
    pub duration_secs: f64,
    pub resolution: Resolution,
}

impl VideoArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }
}
