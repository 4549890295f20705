//! Summaries of the extraction tool's JSON dump (`yt-dlp -J`)

use serde::Deserialize;

use crate::api::models::{AudioFormat, AvailableFormats, VideoFormat, VideoInfo};

const MAX_LISTED_FORMATS: usize = 5;

#[derive(Debug, Deserialize)]
pub struct RawInfo {
    pub title: Option<String>,
    pub duration: Option<f64>,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
pub struct RawFormat {
    pub format_id: String,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub abr: Option<f64>,
    pub ext: Option<String>,
}

pub fn parse_info(json: &[u8], url: &str) -> Result<VideoInfo, serde_json::Error> {
    let raw: RawInfo = serde_json::from_slice(json)?;
    Ok(VideoInfo {
        title: raw.title.unwrap_or_else(|| "Unknown".to_string()),
        duration: raw.duration.unwrap_or(0.0),
        url: url.to_string(),
        formats: summarize_formats(&raw.formats),
    })
}

/// Video formats: one per resolution, highest first. Audio formats: one per
/// bitrate, in tool order. Both capped at five entries.
pub fn summarize_formats(formats: &[RawFormat]) -> AvailableFormats {
    let mut video: Vec<(u32, VideoFormat)> = Vec::new();
    let mut audio: Vec<AudioFormat> = Vec::new();

    for format in formats {
        let ext = format.ext.clone().unwrap_or_else(|| "unknown".to_string());
        let has_video = format.vcodec.as_deref() != Some("none");
        let has_audio = format.acodec.as_deref() != Some("none");

        match format.height {
            Some(height) if has_video => {
                if video.iter().all(|(h, _)| *h != height) {
                    video.push((
                        height,
                        VideoFormat {
                            format_id: format.format_id.clone(),
                            resolution: format!("{height}p"),
                            fps: format.fps,
                            ext,
                        },
                    ));
                }
            }
            _ if has_audio => {
                if audio.iter().all(|a| a.abr != format.abr) {
                    audio.push(AudioFormat {
                        format_id: format.format_id.clone(),
                        abr: format.abr,
                        ext,
                    });
                }
            }
            _ => {}
        }
    }

    video.sort_by(|a, b| b.0.cmp(&a.0));

    AvailableFormats {
        video_formats: video
            .into_iter()
            .take(MAX_LISTED_FORMATS)
            .map(|(_, f)| f)
            .collect(),
        audio_formats: audio.into_iter().take(MAX_LISTED_FORMATS).collect(),
    }
}
