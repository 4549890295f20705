//! Seams around the external media tools
//!
//! - [`MediaFetcher`] - extraction/download tool (yt-dlp)
//! - [`Transcoder`] - fixed-profile re-encode tool (ffmpeg)
//!
//! Both report progress as [`ToolProgress`] events over an mpsc channel; the
//! worker turns those into status records. The traits let the worker and API
//! tests run without the real binaries.

pub mod ffmpeg;
pub mod lines;
pub mod probe;
mod process;
pub mod ytdlp;

use async_trait::async_trait;
use bon::Builder;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::api::models::VideoInfo;
use crate::humanize::ByteSize;
use crate::presets::{DownloadMode, ReencodeProfile};

pub use ffmpeg::Ffmpeg;
pub use ytdlp::YtDlp;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{tool} could not be started: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with code {exit_code:?}: {message}")]
    Failed {
        tool: &'static str,
        exit_code: Option<i32>,
        message: String,
    },

    #[error("failed to parse {tool} output: {message}")]
    Parse { tool: &'static str, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Progress events emitted while a tool runs
#[derive(Debug, Clone, PartialEq)]
pub enum ToolProgress {
    /// Percent (0-100) of the current file
    Downloading { percent: f64 },
    /// Current file fully downloaded
    Finished,
    /// Tool-side post-processor started (merge, audio extraction, ...)
    PostProcessing { step: String },
    /// Fraction (0-1) of the re-encode
    Transcoding { fraction: f64 },
}

pub type ProgressSender = mpsc::UnboundedSender<ToolProgress>;

/// Everything the extraction tool needs for one job
#[derive(Debug, Clone, Builder)]
pub struct FetchRequest {
    #[builder(into)]
    pub url: String,
    pub mode: DownloadMode,
    #[builder(into)]
    pub format_spec: String,
    #[builder(into)]
    pub output_dir: PathBuf,
    /// Appended to the title so different presets never overwrite each other
    #[builder(into)]
    pub file_suffix: String,
    #[builder(default)]
    pub rate_limit: ByteSize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    /// Final paths reported by the tool, in report order
    pub files: Vec<PathBuf>,
}

#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download the media, streaming progress until the tool exits
    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: ProgressSender,
    ) -> Result<FetchOutcome, ToolError>;

    /// Metadata lookup without downloading
    async fn probe(&self, url: &str) -> Result<VideoInfo, ToolError>;
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Re-encode `input` in place with the given profile
    async fn reencode(
        &self,
        input: &Path,
        profile: &ReencodeProfile,
        progress: ProgressSender,
    ) -> Result<(), ToolError>;
}
