use crate::error::FactoryError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output resolution requested for a video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "vertical")]
    Vertical,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P1080 => "1080p",
            Self::P720 => "720p",
            Self::Vertical => "vertical",
        }
    }

    /// Pixel dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::P1080 => (1920, 1080),
            Self::P720 => (1280, 720),
            Self::Vertical => (1080, 1920),
        }
    }

    pub fn is_portrait(&self) -> bool {
        let (width, height) = self.dimensions();
        height > width
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Resolution {
    type Err = FactoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1080p" => Ok(Self::P1080),
            "720p" => Ok(Self::P720),
            "vertical" => Ok(Self::Vertical),
            other => Err(FactoryError::ValidationError(format!(
                "resolution must be one of 1080p, 720p, vertical (got '{other}')"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        assert_eq!(Resolution::P1080.dimensions(), (1920, 1080));
        assert_eq!(Resolution::P720.dimensions(), (1280, 720));
        assert_eq!(Resolution::Vertical.dimensions(), (1080, 1920));
        assert!(Resolution::Vertical.is_portrait());
        assert!(!Resolution::P720.is_portrait());
    }

    #[test]
    fn test_parse() {
        assert_eq!("1080p".parse::<Resolution>().unwrap(), Resolution::P1080);
        assert_eq!(" Vertical ".parse::<Resolution>().unwrap(), Resolution::Vertical);
        let err = "4k".parse::<Resolution>().unwrap_err();
        assert!(matches!(err, FactoryError::ValidationError(_)));
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&Resolution::P720).unwrap(), "\"720p\"");
        let parsed: Resolution = serde_json::from_str("\"vertical\"").unwrap();
        assert_eq!(parsed, Resolution::Vertical);
    }
}
