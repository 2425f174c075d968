//! # Recipes
//!
//! A recipe is a named rendering strategy: the stage template a job runs plus
//! the presentation defaults (layout, pacing, audio profile, captions, fps)
//! handed to collaborators.
//!
//! ## Key Features
//!
//! - **Built-ins**: brainrot, news, stories, ambient and loop10h
//! - **Keyword generation**: asset search terms derived from the topic
//! - **Voice profiles**: voice style to neural voice mapping
//! - **Compatibility**: per-recipe duration constraints

pub mod builtin;
pub mod keywords;
pub mod recipe;
pub mod voice_profiles;

pub use recipe::{
    AudioProfile, CaptionAnimation, CaptionPosition, CaptionSpec, CutSpeed, LayoutConfig,
    LayoutStyle, PacingConfig, Recipe, RecipeConstraints, RecipeDefaults, RecipeKind,
    RecipeSelection, RenderSpec, SubtitleStyle, TransitionKind,
};
pub use voice_profiles::{VoiceParams, VoiceStyle};
