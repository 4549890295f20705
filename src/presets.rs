//! Quality presets and format selection for the extraction tool

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PresetError {
    #[error("unknown quality preset: {0}")]
    UnknownPreset(String),
    #[error("unknown download type: {0} (expected 'audio' or 'audio+video')")]
    UnknownMode(String),
}

/// What the job downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DownloadMode {
    #[default]
    #[serde(rename = "audio")]
    Audio,
    #[serde(rename = "audio+video")]
    AudioVideo,
}

impl DownloadMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadMode::Audio => "audio",
            DownloadMode::AudioVideo => "audio+video",
        }
    }
}

impl FromStr for DownloadMode {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(DownloadMode::Audio),
            "audio+video" => Ok(DownloadMode::AudioVideo),
            other => Err(PresetError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for DownloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed transcode profile applied after download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReencodeProfile {
    pub width: u32,
    pub height: u32,
    pub video_codec: &'static str,
    pub audio_codec: &'static str,
    pub video_bitrate: &'static str,
    pub audio_bitrate: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityPreset {
    pub id: &'static str,
    pub name: &'static str,
    /// `None` means uncapped
    pub max_height: Option<u32>,
    pub prefer_worst: bool,
    pub reencode: Option<ReencodeProfile>,
}

pub const DEFAULT_PRESET: &str = "best";

pub const MINIVAN_PROFILE: ReencodeProfile = ReencodeProfile {
    width: 1280,
    height: 720,
    video_codec: "libx264",
    audio_codec: "aac",
    video_bitrate: "706k",
    audio_bitrate: "192k",
};

/// Table order is the order reported by `GET /api/quality-presets`.
pub const PRESETS: &[QualityPreset] = &[
    QualityPreset {
        id: "minivan",
        name: "Minivan (720p H.264 AAC)",
        max_height: Some(720),
        prefer_worst: false,
        reencode: Some(MINIVAN_PROFILE),
    },
    QualityPreset {
        id: "1080p",
        name: "1080p HD",
        max_height: Some(1080),
        prefer_worst: false,
        reencode: None,
    },
    QualityPreset {
        id: "720p",
        name: "720p",
        max_height: Some(720),
        prefer_worst: false,
        reencode: None,
    },
    QualityPreset {
        id: "480p",
        name: "480p (Low Quality)",
        max_height: Some(480),
        prefer_worst: false,
        reencode: None,
    },
    QualityPreset {
        id: "best",
        name: "Best Available",
        max_height: None,
        prefer_worst: false,
        reencode: None,
    },
    QualityPreset {
        id: "worst",
        name: "Worst Available",
        max_height: None,
        prefer_worst: true,
        reencode: None,
    },
];

pub fn find(id: &str) -> Result<&'static QualityPreset, PresetError> {
    PRESETS
        .iter()
        .find(|preset| preset.id == id)
        .ok_or_else(|| PresetError::UnknownPreset(id.to_string()))
}

impl QualityPreset {
    /// Format selector passed to the extraction tool
    pub fn format_spec(&self, mode: DownloadMode) -> String {
        match mode {
            DownloadMode::Audio => "bestaudio/best".to_string(),
            DownloadMode::AudioVideo if self.prefer_worst => {
                "worstvideo[ext=mp4]+worstaudio[ext=m4a]/worst".to_string()
            }
            DownloadMode::AudioVideo => match self.max_height {
                Some(h) => format!(
                    "bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/best[height<={h}][ext=mp4]/best[height<={h}]/best"
                ),
                None => "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string(),
            },
        }
    }

    /// Re-encode profile, only ever applied to audio+video downloads
    pub fn reencode_for(&self, mode: DownloadMode) -> Option<&ReencodeProfile> {
        match mode {
            DownloadMode::AudioVideo => self.reencode.as_ref(),
            DownloadMode::Audio => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_known_and_unknown() {
        assert_eq!(find("minivan").unwrap().name, "Minivan (720p H.264 AAC)");
        assert_eq!(find(DEFAULT_PRESET).unwrap().max_height, None);
        assert_eq!(
            find("4k").unwrap_err(),
            PresetError::UnknownPreset("4k".to_string())
        );
    }

    #[test]
    fn test_only_minivan_reencodes_and_only_for_video() {
        let with_profile: Vec<_> = PRESETS
            .iter()
            .filter(|p| p.reencode_for(DownloadMode::AudioVideo).is_some())
            .map(|p| p.id)
            .collect();
        assert_eq!(with_profile, vec!["minivan"]);

        assert!(find("minivan").unwrap().reencode_for(DownloadMode::Audio).is_none());
    }

    #[test]
    fn test_format_spec() {
        let p720 = find("720p").unwrap();
        assert_eq!(p720.format_spec(DownloadMode::Audio), "bestaudio/best");
        assert_eq!(
            p720.format_spec(DownloadMode::AudioVideo),
            "bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=720][ext=mp4]/best[height<=720]/best"
        );

        let best = find("best").unwrap();
        assert_eq!(
            best.format_spec(DownloadMode::AudioVideo),
            "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best"
        );

        let worst = find("worst").unwrap();
        assert_eq!(worst.format_spec(DownloadMode::Audio), "bestaudio/best");
        assert_eq!(
            worst.format_spec(DownloadMode::AudioVideo),
            "worstvideo[ext=mp4]+worstaudio[ext=m4a]/worst"
        );
    }

    #[test]
    fn test_mode_wire_format() {
        assert_eq!("audio+video".parse::<DownloadMode>().unwrap(), DownloadMode::AudioVideo);
        assert!("video".parse::<DownloadMode>().is_err());
        assert_eq!(
            serde_json::to_string(&DownloadMode::AudioVideo).unwrap(),
            "\"audio+video\""
        );
    }
}
