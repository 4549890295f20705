//! ffmpeg driver for the fixed re-encode profile

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::lines::{parse_ffmpeg_duration, parse_ffmpeg_time};
use super::process::{StderrTail, for_each_line, spawn};
use super::{ProgressSender, ToolError, ToolProgress, Transcoder};
use crate::config::ToolsConfig;
use crate::presets::ReencodeProfile;

const TOOL: &str = "ffmpeg";

#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: PathBuf,
}

impl Ffmpeg {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn from_config(tools: &ToolsConfig) -> Self {
        Self::new(tools.ffmpeg_path.clone())
    }
}

/// Sibling file the encoder writes to before replacing the input
pub fn temp_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(".temp.mp4");
    PathBuf::from(name)
}

pub fn reencode_args(input: &Path, output: &Path, profile: &ReencodeProfile) -> Vec<OsString> {
    let scale = format!(
        "scale={}:{}:force_original_aspect_ratio=1",
        profile.width, profile.height
    );

    let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-nostdin".into(), "-i".into()];
    args.push(input.as_os_str().to_os_string());
    for arg in [
        "-vf",
        &scale,
        "-c:v",
        profile.video_codec,
        "-b:v",
        profile.video_bitrate,
        "-c:a",
        profile.audio_codec,
        "-b:a",
        profile.audio_bitrate,
        "-y",
    ] {
        args.push(arg.into());
    }
    args.push(output.as_os_str().to_os_string());
    args
}

#[async_trait]
impl Transcoder for Ffmpeg {
    async fn reencode(
        &self,
        input: &Path,
        profile: &ReencodeProfile,
        progress: ProgressSender,
    ) -> Result<(), ToolError> {
        let temp = temp_path(input);
        let args = reencode_args(input, &temp, profile);
        info!(input = %input.display(), "Starting re-encode");

        let mut command = Command::new(&self.binary);
        command.args(&args).stdout(Stdio::null()).stderr(Stdio::piped());
        let mut child = spawn(TOOL, &mut command)?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("ffmpeg stderr not captured"))?;

        let mut duration: Option<f64> = None;
        let mut tail = StderrTail::default();

        for_each_line(stderr, |line| {
            if duration.is_none() {
                duration = parse_ffmpeg_duration(line).filter(|d| *d > 0.0);
            }
            match (parse_ffmpeg_time(line), duration) {
                (Some(position), Some(total)) => {
                    let fraction = (position / total).clamp(0.0, 1.0);
                    let _ = progress.send(ToolProgress::Transcoding { fraction });
                }
                _ => tail.push(line),
            }
        })
        .await?;

        let status = child.wait().await?;
        if !status.success() {
            if let Err(e) = tokio::fs::remove_file(&temp).await {
                debug!(path = %temp.display(), error = %e, "No temp file to clean up");
            }
            let message = tail.into_message();
            warn!(input = %input.display(), exit_code = ?status.code(), %message, "ffmpeg failed");
            return Err(ToolError::Failed {
                tool: TOOL,
                exit_code: status.code(),
                message,
            });
        }

        tokio::fs::rename(&temp, input).await?;
        info!(input = %input.display(), "Re-encode complete");
        Ok(())
    }
}
