//! API models for the mediabox download endpoints.
//!
//! - `POST /api/download` accepts a [`DownloadRequest`] and answers with
//!   [`DownloadAccepted`], one id per submitted URL
//! - `GET /api/download-status/{id}` returns the job's [`StatusRecord`]
//! - `GET /api/downloads` lists [`FileEntry`] items from the download directory
//!
//! # Submission
//!
//! ```json
//! {
//!   "urls": ["https://www.youtube.com/watch?v=dQw4w9WgXcQ"],
//!   "type": "audio+video",
//!   "quality": "minivan",
//!   "speed": "2MB"
//! }
//! ```
//!
//! `type` defaults to `audio`, `quality` to `best`. `speed` is a per-job rate
//! limit in bytes/sec (integer or `"2MB"`-style string); `0` disables it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::humanize::ByteSize;
use crate::observability::MetricsSnapshot;

#[derive(Debug, Deserialize, Clone)]
pub struct DownloadRequest {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(rename = "type", default = "default_download_type")]
    pub download_type: String,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default)]
    pub speed: Option<ByteSize>,
}

fn default_download_type() -> String {
    "audio".to_string()
}

fn default_quality() -> String {
    crate::presets::DEFAULT_PRESET.to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DownloadAccepted {
    pub download_ids: Vec<String>,
}

/// Lifecycle state of a download job
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Downloading,
    Processing,
    /// Tool finished writing the file, post-processing may follow
    Finished,
    Completed,
    Error,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Error)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StatusRecord {
    pub status: JobState,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl StatusRecord {
    pub fn new(status: JobState, progress: u8, message: impl Into<String>) -> Self {
        Self {
            status,
            progress: progress.min(100),
            message: Some(message.into()),
            error: None,
            updated_at: chrono::Utc::now(),
        }
    }

    pub fn queued() -> Self {
        Self {
            status: JobState::Queued,
            progress: 0,
            message: None,
            error: None,
            updated_at: chrono::Utc::now(),
        }
    }

    pub fn failed(progress: u8, url: &str, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            status: JobState::Error,
            progress: progress.min(100),
            message: Some(format!("{url} - Error: {error}")),
            error: Some(error),
            updated_at: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PresetInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClearResponse {
    pub success: bool,
    pub deleted: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VideoInfoRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VideoInfo {
    pub title: String,
    pub duration: f64,
    pub url: String,
    pub formats: AvailableFormats,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct AvailableFormats {
    pub video_formats: Vec<VideoFormat>,
    pub audio_formats: Vec<AudioFormat>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VideoFormat {
    pub format_id: String,
    pub resolution: String,
    pub fps: Option<f64>,
    pub ext: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AudioFormat {
    pub format_id: String,
    pub abr: Option<f64>,
    pub ext: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
    pub metrics: MetricsSnapshot,
}
