//! yt-dlp driver

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use super::lines::{self, YtDlpLine};
use super::process::{StderrTail, for_each_line, spawn};
use super::{FetchOutcome, FetchRequest, MediaFetcher, ProgressSender, ToolError};
use crate::api::models::VideoInfo;
use crate::config::ToolsConfig;
use crate::presets::DownloadMode;

const TOOL: &str = "yt-dlp";

#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    socket_timeout: Duration,
    extra_args: Vec<String>,
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>, socket_timeout: Duration, extra_args: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            socket_timeout,
            extra_args,
        }
    }

    pub fn from_config(tools: &ToolsConfig) -> Self {
        Self::new(
            &tools.ytdlp_path,
            Duration::from_secs(tools.socket_timeout_secs),
            tools.extra_args.clone(),
        )
    }

    /// Command line for a download, without the binary
    pub fn download_args(&self, request: &FetchRequest) -> Vec<String> {
        let output = request
            .output_dir
            .join(format!("%(title)s_{}.%(ext)s", request.file_suffix));

        let mut args = vec![
            "-f".to_string(),
            request.format_spec.clone(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            lines::download_template(),
            "--progress-template".to_string(),
            lines::postprocess_template(),
            "--print".to_string(),
            lines::output_template(),
            "--restrict-filenames".to_string(),
            "--socket-timeout".to_string(),
            self.socket_timeout.as_secs().to_string(),
        ];

        if !request.rate_limit.is_zero() {
            args.push("--limit-rate".to_string());
            args.push(request.rate_limit.as_u64().to_string());
        }

        match request.mode {
            DownloadMode::Audio => args.extend(
                ["-x", "--audio-format", "mp3", "--audio-quality", "192K"].map(String::from),
            ),
            DownloadMode::AudioVideo => {
                args.extend(["--merge-output-format", "mp4"].map(String::from))
            }
        }

        args.push("-o".to_string());
        args.push(output.to_string_lossy().into_owned());
        args.extend(self.extra_args.iter().cloned());
        args.push("--".to_string());
        args.push(request.url.clone());
        args
    }

    pub fn probe_args(&self, url: &str) -> Vec<String> {
        let mut args: Vec<String> = ["-J", "--no-warnings", "--skip-download", "--no-playlist"]
            .map(String::from)
            .to_vec();
        args.push("--socket-timeout".to_string());
        args.push(self.socket_timeout.as_secs().to_string());
        args.extend(self.extra_args.iter().cloned());
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl MediaFetcher for YtDlp {
    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: ProgressSender,
    ) -> Result<FetchOutcome, ToolError> {
        let args = self.download_args(request);
        debug!(binary = %self.binary.display(), ?args, "Spawning yt-dlp");

        let mut command = Command::new(&self.binary);
        command.args(&args).stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = spawn(TOOL, &mut command)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("yt-dlp stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("yt-dlp stderr not captured"))?;

        let mut outcome = FetchOutcome::default();
        let mut tail = StderrTail::default();

        let read_stdout = for_each_line(stdout, |line| match lines::parse_ytdlp_line(line) {
            YtDlpLine::Progress(event) => {
                let _ = progress.send(event);
            }
            YtDlpLine::Output(path) => outcome.files.push(path),
            YtDlpLine::Other => debug!(line, "yt-dlp"),
        });
        let read_stderr = for_each_line(stderr, |line| {
            debug!(line, "yt-dlp stderr");
            tail.push(line);
        });

        let (stdout_result, stderr_result) = tokio::join!(read_stdout, read_stderr);
        stdout_result?;
        stderr_result?;

        let status = child.wait().await?;
        if !status.success() {
            return Err(ToolError::Failed {
                tool: TOOL,
                exit_code: status.code(),
                message: tail.into_message(),
            });
        }

        info!(url = %request.url, files = ?outcome.files, "yt-dlp download complete");
        Ok(outcome)
    }

    async fn probe(&self, url: &str) -> Result<VideoInfo, ToolError> {
        let output = Command::new(&self.binary)
            .args(self.probe_args(url))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ToolError::Spawn { tool: TOOL, source })?;

        if !output.status.success() {
            let mut tail = StderrTail::default();
            String::from_utf8_lossy(&output.stderr)
                .lines()
                .for_each(|line| tail.push(line));
            return Err(ToolError::Failed {
                tool: TOOL,
                exit_code: output.status.code(),
                message: tail.into_message(),
            });
        }

        super::probe::parse_info(&output.stdout, url).map_err(|e| ToolError::Parse {
            tool: TOOL,
            message: e.to_string(),
        })
    }
}
