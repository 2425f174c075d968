//! The five built-in recipes.

use super::recipe::{
    AudioProfile, CaptionAnimation, CaptionPosition, CutSpeed, LayoutConfig, LayoutStyle,
    PacingConfig, Recipe, RecipeConstraints, RecipeDefaults, RecipeKind, SubtitleStyle,
    TransitionKind,
};
use super::voice_profiles::VoiceStyle;
use crate::models::Resolution;
use crate::orchestration::types::{StageKind, StagePolicy, StageSpec};

fn script_stage() -> StageSpec {
    StageSpec::new(StageKind::ScriptGeneration, StagePolicy::from_secs(60, 3))
}

fn voice_stage(after: &[StageKind]) -> StageSpec {
    StageSpec::new(StageKind::VoiceSynthesis, StagePolicy::from_secs(120, 3)).after(after)
}

fn asset_stage() -> StageSpec {
    StageSpec::new(StageKind::AssetFetch, StagePolicy::from_secs(60, 3))
}

fn alignment_stage() -> StageSpec {
    StageSpec::new(StageKind::Alignment, StagePolicy::from_secs(300, 2))
        .after(&[StageKind::VoiceSynthesis])
}

fn composition_stage() -> StageSpec {
    StageSpec::new(StageKind::Composition, StagePolicy::from_secs(1_800, 1)).after(&[
        StageKind::AssetFetch,
        StageKind::Alignment,
        StageKind::VoiceSynthesis,
    ])
}

fn looping_stage() -> StageSpec {
    StageSpec::new(StageKind::Looping, StagePolicy::from_secs(3_600, 1))
        .after(&[StageKind::Composition])
}

/// Narrated graph: script feeds voice, captions follow the narration
fn narrated_stages() -> Vec<StageSpec> {
    vec![
        script_stage(),
        voice_stage(&[StageKind::ScriptGeneration]),
        asset_stage(),
        alignment_stage(),
        composition_stage(),
    ]
}

fn atmospheric_stages() -> Vec<StageSpec> {
    vec![
        voice_stage(&[]),
        asset_stage(),
        alignment_stage(),
        composition_stage(),
    ]
}

fn white_subtitles(font: &str, font_size: u32, position: CaptionPosition) -> SubtitleStyle {
    SubtitleStyle {
        font: font.to_string(),
        font_size,
        color: "#FFFFFF".to_string(),
        outline_color: "#000000".to_string(),
        position,
        animation: CaptionAnimation::FadeIn,
        bold: false,
    }
}

pub fn brainrot() -> Recipe {
    Recipe {
        kind: RecipeKind::Brainrot,
        description: "Fast-paced, high-energy short form".to_string(),
        defaults: RecipeDefaults {
            duration_secs: 60.0,
            resolution: Resolution::P1080,
        },
        fps: 60,
        aspect_ratio: "16:9".to_string(),
        layout: LayoutConfig {
            style: LayoutStyle::Fullscreen,
            transition: TransitionKind::Cut,
            transition_secs: 0.1,
        },
        pacing: PacingConfig {
            min_clip_secs: 1.0,
            max_clip_secs: 3.0,
            cut_speed: CutSpeed::Fast,
            fade_secs: 0.1,
        },
        audio: AudioProfile {
            voice_style: VoiceStyle::Energetic,
            background_music: true,
            music_volume: 0.6,
            sound_effects: true,
            narration_volume: 0.8,
        },
        subtitles: SubtitleStyle {
            animation: CaptionAnimation::WordByWord,
            bold: true,
            ..white_subtitles("Arial-Bold", 48, CaptionPosition::Center)
        },
        constraints: RecipeConstraints::default(),
        stages: narrated_stages(),
    }
}

pub fn news() -> Recipe {
    Recipe {
        kind: RecipeKind::News,
        description: "Professional report with lower thirds".to_string(),
        defaults: RecipeDefaults {
            duration_secs: 120.0,
            resolution: Resolution::P1080,
        },
        fps: 30,
        aspect_ratio: "16:9".to_string(),
        layout: LayoutConfig {
            style: LayoutStyle::Overlay,
            transition: TransitionKind::Fade,
            transition_secs: 0.5,
        },
        pacing: PacingConfig {
            min_clip_secs: 5.0,
            max_clip_secs: 8.0,
            cut_speed: CutSpeed::Medium,
            fade_secs: 0.5,
        },
        audio: AudioProfile {
            voice_style: VoiceStyle::News,
            background_music: false,
            music_volume: 0.0,
            sound_effects: false,
            narration_volume: 0.9,
        },
        subtitles: SubtitleStyle {
            animation: CaptionAnimation::Block,
            ..white_subtitles("Arial", 36, CaptionPosition::Bottom)
        },
        constraints: RecipeConstraints::default(),
        stages: narrated_stages(),
    }
}

pub fn stories() -> Recipe {
    Recipe {
        kind: RecipeKind::Stories,
        description: "Conversational vertical story".to_string(),
        defaults: RecipeDefaults {
            duration_secs: 30.0,
            resolution: Resolution::Vertical,
        },
        fps: 30,
        aspect_ratio: "9:16".to_string(),
        layout: LayoutConfig {
            style: LayoutStyle::Fullscreen,
            transition: TransitionKind::Fade,
            transition_secs: 0.3,
        },
        pacing: PacingConfig {
            min_clip_secs: 3.0,
            max_clip_secs: 5.0,
            cut_speed: CutSpeed::Medium,
            fade_secs: 0.3,
        },
        audio: AudioProfile {
            voice_style: VoiceStyle::Friendly,
            background_music: true,
            music_volume: 0.4,
            sound_effects: false,
            narration_volume: 0.85,
        },
        subtitles: white_subtitles("Arial", 42, CaptionPosition::Center),
        constraints: RecipeConstraints::default(),
        stages: narrated_stages(),
    }
}

pub fn ambient() -> Recipe {
    Recipe {
        kind: RecipeKind::Ambient,
        description: "Slow, calming visuals with light narration".to_string(),
        defaults: RecipeDefaults {
            duration_secs: 300.0,
            resolution: Resolution::P1080,
        },
        fps: 24,
        aspect_ratio: "16:9".to_string(),
        layout: LayoutConfig {
            style: LayoutStyle::KenBurns,
            transition: TransitionKind::Crossfade,
            transition_secs: 2.0,
        },
        pacing: PacingConfig {
            min_clip_secs: 30.0,
            max_clip_secs: 60.0,
            cut_speed: CutSpeed::Slow,
            fade_secs: 2.0,
        },
        audio: AudioProfile {
            voice_style: VoiceStyle::Calm,
            background_music: true,
            music_volume: 0.7,
            sound_effects: false,
            narration_volume: 0.3,
        },
        subtitles: SubtitleStyle {
            color: "#CCCCCC".to_string(),
            ..white_subtitles("Arial", 32, CaptionPosition::Bottom)
        },
        constraints: RecipeConstraints::default(),
        stages: atmospheric_stages(),
    }
}

/// Ambient extended into a long seamless loop
pub fn loop10h(min_duration_secs: f64) -> Recipe {
    let mut stages = atmospheric_stages();
    stages.push(looping_stage());

    Recipe {
        kind: RecipeKind::Loop10h,
        description: "Ten hour ambient loop".to_string(),
        defaults: RecipeDefaults {
            duration_secs: 36_000.0,
            resolution: Resolution::P1080,
        },
        layout: LayoutConfig {
            style: LayoutStyle::KenBurns,
            transition: TransitionKind::Crossfade,
            transition_secs: 3.0,
        },
        pacing: PacingConfig {
            min_clip_secs: 60.0,
            max_clip_secs: 120.0,
            cut_speed: CutSpeed::Slow,
            fade_secs: 3.0,
        },
        constraints: RecipeConstraints {
            min_duration_secs: Some(min_duration_secs),
        },
        stages,
        ..ambient()
    }
}

/// All built-ins in registration order
pub fn all(loop_min_duration_secs: f64) -> Vec<Recipe> {
    vec![
        brainrot(),
        news(),
        stories(),
        ambient(),
        loop10h(loop_min_duration_secs),
    ]
}
