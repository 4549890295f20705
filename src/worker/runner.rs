//! Job runner - takes one job from `queued` to a terminal status

use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::WorkerContext;
use super::progress::{PROCESSING_FLOOR, ProgressReporter};
use crate::api::models::{JobState, StatusRecord};
use crate::library;
use crate::presets::{self, PresetError, QualityPreset, ReencodeProfile};
use crate::queue::Job;
use crate::tools::{FetchOutcome, FetchRequest, ToolError};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Preset(#[from] PresetError),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

pub type Result<T> = std::result::Result<T, TaskError>;

/// Run a job to completion. Never fails: every outcome ends up in the status
/// store, and the job is acked either way.
pub async fn process_job(ctx: &WorkerContext, job: Job) {
    info!(job_id = %job.id, url = %job.url, quality = %job.quality, mode = %job.mode, "Processing job");

    let mut reporter = ProgressReporter::new(ctx.status.clone(), &job.id, &job.url);
    reporter.reset().await;

    match run(ctx, &job, &mut reporter).await {
        Ok(()) => {
            ctx.metrics.job_completed();
            info!(job_id = %job.id, "Job completed");
            reporter
                .finish(StatusRecord::new(
                    JobState::Completed,
                    100,
                    format!("{} - Completed", job.url),
                ))
                .await;
        }
        Err(e) => {
            ctx.metrics.job_failed();
            error!(job_id = %job.id, url = %job.url, error = %e, "Job failed");
            let record = StatusRecord::failed(reporter.progress(), &job.url, e.to_string());
            reporter.finish(record).await;
        }
    }

    if let Err(e) = ctx.broker.ack(job.seq).await {
        warn!(job_id = %job.id, error = %e, "Failed to ack job");
    }
}

async fn run(ctx: &WorkerContext, job: &Job, reporter: &mut ProgressReporter<'_>) -> Result<()> {
    let preset = presets::find(&job.quality)?;

    let request = FetchRequest::builder()
        .url(job.url.as_str())
        .mode(job.mode)
        .format_spec(preset.format_spec(job.mode))
        .output_dir(ctx.download_dir.as_path())
        .file_suffix(preset.id)
        .rate_limit(job.rate_limit)
        .build();

    reporter.report(JobState::Downloading, 0, "Starting download").await;

    let (tx, rx) = mpsc::unbounded_channel();
    let (outcome, ()) = tokio::join!(ctx.fetcher.fetch(&request, tx), reporter.drain(rx));
    let outcome = outcome?;

    if let Some(profile) = preset.reencode_for(job.mode) {
        reencode(ctx, job, preset, profile, &outcome, reporter).await;
    }

    Ok(())
}

/// Failures here are logged and swallowed; the download itself succeeded
async fn reencode(
    ctx: &WorkerContext,
    job: &Job,
    preset: &QualityPreset,
    profile: &ReencodeProfile,
    outcome: &FetchOutcome,
    reporter: &mut ProgressReporter<'_>,
) {
    let Some(input) = reencode_target(ctx, preset, outcome).await else {
        warn!(job_id = %job.id, preset = preset.id, "No downloaded file to re-encode");
        ctx.metrics.reencode_failed();
        return;
    };

    reporter
        .report(JobState::Processing, PROCESSING_FLOOR, "Re-encoding")
        .await;

    let (tx, rx) = mpsc::unbounded_channel();
    let (result, ()) = tokio::join!(
        ctx.transcoder.reencode(&input, profile, tx),
        reporter.drain(rx)
    );

    match result {
        Ok(()) => info!(job_id = %job.id, path = %input.display(), "Re-encode finished"),
        Err(e) => {
            ctx.metrics.reencode_failed();
            warn!(job_id = %job.id, path = %input.display(), error = %e, "Re-encode failed, keeping original file");
        }
    }
}

/// Last mp4 the fetcher reported, else the newest `*_<preset>.mp4` on disk
async fn reencode_target(
    ctx: &WorkerContext,
    preset: &QualityPreset,
    outcome: &FetchOutcome,
) -> Option<PathBuf> {
    let reported = outcome
        .files
        .iter()
        .rev()
        .find(|path| path.extension().is_some_and(|ext| ext == "mp4"));
    if let Some(path) = reported {
        return Some(path.clone());
    }

    match library::latest_matching(&ctx.download_dir, preset.id, "mp4").await {
        Ok(found) => found,
        Err(e) => {
            warn!(dir = %ctx.download_dir.display(), error = %e, "Failed to scan download directory");
            None
        }
    }
}
