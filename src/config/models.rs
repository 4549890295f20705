use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Root for the job queue keyspace and status files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Where the tools write finished media
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: ByteSize,
}

impl ServerConfig {
    pub fn queue_path(&self) -> PathBuf {
        self.data_dir.join("queue")
    }

    pub fn status_dir(&self) -> PathBuf {
        self.data_dir.join("status")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            data_dir: default_data_dir(),
            download_dir: default_download_dir(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_max_payload_bytes() -> ByteSize {
    ByteSize::mib(1)
}

/// External tool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: PathBuf,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    #[serde(default = "default_socket_timeout_secs")]
    pub socket_timeout_secs: u64,
    /// Applied when a request carries no `speed`; zero disables the limit
    #[serde(default = "default_rate_limit")]
    pub default_rate_limit: ByteSize,
    /// Appended to every yt-dlp invocation before the URL
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            ffmpeg_path: default_ffmpeg_path(),
            socket_timeout_secs: default_socket_timeout_secs(),
            default_rate_limit: default_rate_limit(),
            extra_args: Vec::new(),
        }
    }
}

fn default_ytdlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_socket_timeout_secs() -> u64 {
    30
}

fn default_rate_limit() -> ByteSize {
    ByteSize::mib(2)
}

/// Retention configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    #[serde(default = "default_status_ttl_hours")]
    pub status_ttl_hours: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl RetentionConfig {
    pub fn status_ttl(&self) -> Duration {
        Duration::from_secs(self.status_ttl_hours * 3600)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            status_ttl_hours: default_status_ttl_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_status_ttl_hours() -> u64 {
    crate::status::STATUS_TTL_HOURS
}

fn default_sweep_interval_secs() -> u64 {
    3600
}
