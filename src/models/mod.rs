//! # Data Models
//!
//! Jobs, generation requests, artifacts and output resolutions.

pub mod artifact;
pub mod job;
pub mod resolution;

pub use artifact::{
    ArtifactRef, AudioArtifact, MediaArtifact, MediaKind, MediaSource, VideoArtifact, WordTiming,
};
pub use job::{ErrorRecord, GenerationRequest, Job, JobId, JobView, RecipeDecision};
pub use resolution::Resolution;
