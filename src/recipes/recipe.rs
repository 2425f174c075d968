use super::keywords;
use super::voice_profiles::{VoiceParams, VoiceStyle};
use crate::constants::limits::{MAX_ASSET_COUNT, MIN_ASSET_COUNT};
use crate::error::{FactoryError, FactoryResult};
use crate::models::{Resolution, WordTiming};
use crate::orchestration::types::{StageKind, StageSpec};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Built-in rendering strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeKind {
    Brainrot,
    News,
    Stories,
    Ambient,
    Loop10h,
}

impl RecipeKind {
    pub const ALL: [RecipeKind; 5] = [
        RecipeKind::Brainrot,
        RecipeKind::News,
        RecipeKind::Stories,
        RecipeKind::Ambient,
        RecipeKind::Loop10h,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Brainrot => "brainrot",
            Self::News => "news",
            Self::Stories => "stories",
            Self::Ambient => "ambient",
            Self::Loop10h => "loop10h",
        }
    }
}

impl fmt::Display for RecipeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for RecipeKind {
    type Err = FactoryError;

    /// Names match case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        RecipeKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| FactoryError::UnknownRecipe(s.trim().to_string()))
    }
}

/// Caller's recipe choice: a concrete recipe or director selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecipeSelection {
    Auto,
    Fixed(RecipeKind),
}

impl RecipeSelection {
    pub fn fixed(&self) -> Option<RecipeKind> {
        match self {
            Self::Auto => None,
            Self::Fixed(kind) => Some(*kind),
        }
    }
}

impl fmt::Display for RecipeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Fixed(kind) => write!(f, "{kind}"),
        }
    }
}

impl std::str::FromStr for RecipeSelection {
    type Err = FactoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        s.parse().map(Self::Fixed)
    }
}

impl TryFrom<String> for RecipeSelection {
    type Error = FactoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecipeSelection> for String {
    fn from(selection: RecipeSelection) -> Self {
        selection.to_string()
    }
}

/// Values used when the request leaves them unspecified
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecipeDefaults {
    pub duration_secs: f64,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutStyle {
    Fullscreen,
    Overlay,
    SplitScreen,
    KenBurns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionKind {
    Cut,
    Fade,
    Wipe,
    Crossfade,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub style: LayoutStyle,
    pub transition: TransitionKind,
    pub transition_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CutSpeed {
    Fast,
    Medium,
    Slow,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PacingConfig {
    pub min_clip_secs: f64,
    pub max_clip_secs: f64,
    pub cut_speed: CutSpeed,
    pub fade_secs: f64,
}

impl PacingConfig {
    pub fn average_clip_secs(&self) -> f64 {
        (self.min_clip_secs + self.max_clip_secs) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioProfile {
    pub voice_style: VoiceStyle,
    pub background_music: bool,
    pub music_volume: f32,
    pub sound_effects: bool,
    pub narration_volume: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionPosition {
    Top,
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptionAnimation {
    WordByWord,
    Block,
    FadeIn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleStyle {
    pub font: String,
    pub font_size: u32,
    pub color: String,
    pub outline_color: String,
    pub position: CaptionPosition,
    pub animation: CaptionAnimation,
    pub bold: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RecipeConstraints {
    /// Requests shorter than this are rejected for the recipe
    pub min_duration_secs: Option<f64>,
}

/// Caption track handed to the compositor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSpec {
    pub style: SubtitleStyle,
    pub timings: Vec<WordTiming>,
}

/// Render settings handed to the compositor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSpec {
    pub resolution: Resolution,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub aspect_ratio: String,
    pub layout: LayoutConfig,
    pub pacing: PacingConfig,
    pub audio: AudioProfile,
    pub duration_secs: f64,
}

/// An immutable rendering strategy and its stage template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub kind: RecipeKind,
    pub description: String,
    pub defaults: RecipeDefaults,
    pub fps: u32,
    pub aspect_ratio: String,
    pub layout: LayoutConfig,
    pub pacing: PacingConfig,
    pub audio: AudioProfile,
    pub subtitles: SubtitleStyle,
    pub constraints: RecipeConstraints,
    pub stages: Vec<StageSpec>,
}

impl Recipe {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn stage(&self, kind: StageKind) -> Option<&StageSpec> {
        self.stages.iter().find(|spec| spec.kind == kind)
    }

    pub fn has_stage(&self, kind: StageKind) -> bool {
        self.stage(kind).is_some()
    }

    /// Requested duration, or the recipe default when absent
    pub fn effective_duration(&self, requested: Option<f64>) -> f64 {
        requested.unwrap_or(self.defaults.duration_secs)
    }

    /// Reject durations the recipe cannot produce
    pub fn check_compatibility(&self, duration_secs: f64) -> FactoryResult<()> {
        match self.constraints.min_duration_secs {
            Some(min) if duration_secs < min => Err(FactoryError::ValidationError(format!(
                "recipe {} requires a duration of at least {min} seconds (got {duration_secs})",
                self.kind
            ))),
            _ => Ok(()),
        }
    }

    /// Prompt for the script writer
    pub fn story_prompt(&self, topic: &str) -> String {
        match self.kind {
            RecipeKind::News => format!(
                "Write a professional news report script about: {topic}. Include an introduction, main points, and conclusion."
            ),
            RecipeKind::Stories => format!(
                "Write a short, engaging story script about: {topic}. Keep it conversational and friendly, suitable for a 30-second video."
            ),
            RecipeKind::Ambient => format!(
                "Create a brief, minimal description for an ambient video about: {topic}. Keep it very short, focusing on atmosphere."
            ),
            RecipeKind::Loop10h => format!(
                "Create a very brief, atmospheric description for a 10-hour looping ambient video about: {topic}. Focus on visual elements that can loop seamlessly."
            ),
            RecipeKind::Brainrot => {
                format!("Create a {} style video script about: {topic}", self.kind)
            }
        }
    }

    /// Narration used when the recipe has no script stage
    pub fn narration_text(&self, topic: &str) -> String {
        format!("{topic}. Breathe slowly and let the scene unfold around you.")
    }

    /// Search keywords for the asset provider
    pub fn keywords(&self, topic: &str) -> Vec<String> {
        match self.kind {
            RecipeKind::Brainrot => keywords::brainrot_keywords(topic),
            RecipeKind::Ambient | RecipeKind::Loop10h => keywords::ambient_keywords(topic),
            RecipeKind::News | RecipeKind::Stories => keywords::generic_keywords(topic),
        }
    }

    pub fn asset_query(&self, topic: &str) -> String {
        let keywords = self.keywords(topic);
        if keywords.is_empty() {
            topic.trim().to_lowercase()
        } else {
            keywords.join(" ")
        }
    }

    /// Number of clips needed to cover `duration_secs` at the recipe's pacing
    pub fn asset_count(&self, duration_secs: f64) -> u32 {
        let average = self.pacing.average_clip_secs();
        if average.is_nan() || average <= 0.0 || !duration_secs.is_finite() {
            return MIN_ASSET_COUNT;
        }
        let needed = (duration_secs / average).ceil();
        (needed.max(0.0) as u32).clamp(MIN_ASSET_COUNT, MAX_ASSET_COUNT)
    }

    pub fn voice_params(&self, voice_index: usize) -> VoiceParams {
        VoiceParams::for_style(
            self.audio.voice_style,
            voice_index,
            self.audio.narration_volume,
        )
    }

    pub fn caption_spec(&self, timings: &[WordTiming]) -> CaptionSpec {
        CaptionSpec {
            style: self.subtitles.clone(),
            timings: timings.to_vec(),
        }
    }

    pub fn render_spec(&self, resolution: Resolution, duration_secs: f64) -> RenderSpec {
        let (width, height) = resolution.dimensions();
        RenderSpec {
            resolution,
            width,
            height,
            fps: self.fps,
            aspect_ratio: self.aspect_ratio.clone(),
            layout: self.layout,
            pacing: self.pacing,
            audio: self.audio,
            duration_secs,
        }
    }
}
