use serde::{Deserialize, Serialize};

use crate::humanize::ByteSize;
use crate::presets::DownloadMode;

/// A submitted download request, before it has a sequence number
#[derive(Debug, Clone, PartialEq)]
pub struct JobDraft {
    pub url: String,
    pub mode: DownloadMode,
    pub quality: String,
    /// Bytes per second, zero means unlimited
    pub rate_limit: ByteSize,
}

/// One queued download (+ optional transcode). Immutable once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub seq: u64,
    pub id: String,
    pub url: String,
    pub mode: DownloadMode,
    pub quality: String,
    pub rate_limit: ByteSize,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

impl Job {
    pub fn from_draft(seq: u64, draft: JobDraft) -> Self {
        Self {
            seq,
            id: job_id_for(seq),
            url: draft.url,
            mode: draft.mode,
            quality: draft.quality,
            rate_limit: draft.rate_limit,
            submitted_at: chrono::Utc::now(),
        }
    }
}

pub fn job_id_for(seq: u64) -> String {
    format!("download_{seq}")
}
