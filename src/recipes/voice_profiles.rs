//! Voice styles and the neural voices that realise them.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceStyle {
    Energetic,
    Calm,
    News,
    Friendly,
}

impl VoiceStyle {
    /// Voices for this style in preference order
    pub fn voices(&self) -> &'static [&'static str] {
        match self {
            Self::Energetic => &["en-US-JennyNeural", "en-US-GuyNeural", "en-US-AriaNeural"],
            Self::Calm => &[
                "en-US-MichelleNeural",
                "en-US-DavisNeural",
                "en-US-ChristopherNeural",
            ],
            Self::News => &["en-US-AriaNeural", "en-US-GuyNeural", "en-US-JennyNeural"],
            Self::Friendly => &["en-US-JennyNeural", "en-US-MichelleNeural", "en-US-DavisNeural"],
        }
    }

    /// Pick a voice, wrapping around when `index` exceeds the list
    pub fn voice(&self, index: usize) -> &'static str {
        let voices = self.voices();
        voices[index % voices.len()]
    }
}

impl fmt::Display for VoiceStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Energetic => write!(f, "energetic"),
            Self::Calm => write!(f, "calm"),
            Self::News => write!(f, "news"),
            Self::Friendly => write!(f, "friendly"),
        }
    }
}

/// Parameters handed to the voice synthesizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceParams {
    pub voice: String,
    pub rate: String,
    pub pitch: String,
    pub volume: String,
    /// Mix level of the narration track (0.0 to 1.0)
    pub narration_volume: f32,
}

impl VoiceParams {
    pub fn for_style(style: VoiceStyle, index: usize, narration_volume: f32) -> Self {
        Self {
            voice: style.voice(index).to_string(),
            rate: "+0%".to_string(),
            pitch: "+0Hz".to_string(),
            volume: "+0%".to_string(),
            narration_volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_selection_wraps() {
        assert_eq!(VoiceStyle::Calm.voice(0), "en-US-MichelleNeural");
        assert_eq!(VoiceStyle::Calm.voice(2), "en-US-ChristopherNeural");
        assert_eq!(VoiceStyle::Calm.voice(3), "en-US-MichelleNeural");
        assert_eq!(VoiceStyle::News.voice(7), "en-US-GuyNeural");
    }

    #[test]
    fn test_default_params() {
        let params = VoiceParams::for_style(VoiceStyle::Energetic, 0, 0.8);
        assert_eq!(params.voice, "en-US-JennyNeural");
        assert_eq!(params.rate, "+0%");
        assert_eq!(params.pitch, "+0Hz");
    }
}
