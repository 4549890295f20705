//! Maps tool progress events onto status records
//!
//! Bands: queued 0, downloading 0-80, finished 80, tool post-processing 85,
//! re-encode 85-99, completed 100. Within one job the reported progress only
//! ever grows; the store itself stays last-write-wins.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::models::{JobState, StatusRecord};
use crate::status::StatusStore;
use crate::tools::ToolProgress;

pub const DOWNLOAD_CEILING: u8 = 80;
pub const PROCESSING_FLOOR: u8 = 85;
pub const PROCESSING_CEILING: u8 = 99;

/// Status, progress and phase text for one tool event
pub fn band(event: &ToolProgress) -> (JobState, u8, String) {
    match event {
        ToolProgress::Downloading { percent } => {
            let percent = percent.clamp(0.0, 100.0);
            let scaled = (percent * f64::from(DOWNLOAD_CEILING) / 100.0) as u8;
            (
                JobState::Downloading,
                scaled,
                format!("Downloading {percent:.1}%"),
            )
        }
        ToolProgress::Finished => (
            JobState::Finished,
            DOWNLOAD_CEILING,
            "Download finished".to_string(),
        ),
        ToolProgress::PostProcessing { step } => (
            JobState::Processing,
            PROCESSING_FLOOR,
            format!("Processing ({step})"),
        ),
        ToolProgress::Transcoding { fraction } => {
            let fraction = fraction.clamp(0.0, 1.0);
            let span = f64::from(PROCESSING_CEILING - PROCESSING_FLOOR);
            let progress = PROCESSING_FLOOR + (fraction * span).round() as u8;
            (
                JobState::Processing,
                progress.min(PROCESSING_CEILING),
                format!("Re-encoding {:.0}%", fraction * 100.0),
            )
        }
    }
}

/// Writes go through [`StatusStore::set_async`] so file I/O stays off the
/// runtime threads
pub struct ProgressReporter<'a> {
    status: Arc<StatusStore>,
    job_id: &'a str,
    url: &'a str,
    last: Option<(JobState, u8)>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(status: Arc<StatusStore>, job_id: &'a str, url: &'a str) -> Self {
        Self {
            status,
            job_id,
            url,
            last: None,
        }
    }

    /// Highest progress written so far
    pub fn progress(&self) -> u8 {
        self.last.map(|(_, p)| p).unwrap_or(0)
    }

    /// Write `queued`/0, dropping whatever a previous lifecycle left behind
    pub async fn reset(&mut self) {
        self.last = Some((JobState::Queued, 0));
        self.write(StatusRecord::queued()).await;
    }

    pub async fn report(&mut self, state: JobState, progress: u8, phase: &str) {
        let progress = progress.max(self.progress());
        if self.last == Some((state, progress)) {
            return;
        }
        self.last = Some((state, progress));
        self.write(StatusRecord::new(
            state,
            progress,
            format!("{} - {phase}", self.url),
        ))
        .await;
    }

    pub async fn on_event(&mut self, event: &ToolProgress) {
        let (state, progress, phase) = band(event);
        self.report(state, progress, &phase).await;
    }

    /// Consume events until every sender is dropped
    pub async fn drain(&mut self, mut events: mpsc::UnboundedReceiver<ToolProgress>) {
        while let Some(event) = events.recv().await {
            debug!(job_id = self.job_id, ?event, "Tool progress");
            self.on_event(&event).await;
        }
    }

    /// Terminal record; bypasses the dedupe but not the clamp
    pub async fn finish(&mut self, mut record: StatusRecord) {
        record.progress = record.progress.max(self.progress());
        self.last = Some((record.status, record.progress));
        self.write(record).await;
    }

    async fn write(&self, record: StatusRecord) {
        if let Err(e) = self.status.set_async(self.job_id, record).await {
            warn!(job_id = self.job_id, error = %e, "Failed to record status");
        }
    }
}
