//! Download worker service
//!
//! A single task consumes jobs from the broker channel and runs them one at a
//! time, in the order they were submitted. A second task sweeps expired status
//! records.

pub mod progress;
pub mod runner;
pub mod sweeper;

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::observability::Metrics;
use crate::queue::{Job, JobBroker};
use crate::status::StatusStore;
use crate::tools::{MediaFetcher, Transcoder};

/// Everything a running job touches
#[derive(Clone)]
pub struct WorkerContext {
    pub broker: Arc<JobBroker>,
    pub status: Arc<StatusStore>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub transcoder: Arc<dyn Transcoder>,
    pub metrics: Arc<Metrics>,
    pub download_dir: PathBuf,
}

/// Process jobs until every sender is gone
pub async fn run(ctx: WorkerContext, mut jobs: mpsc::UnboundedReceiver<Job>) {
    info!(download_dir = %ctx.download_dir.display(), "Download worker started");

    while let Some(job) = jobs.recv().await {
        runner::process_job(&ctx, job).await;
    }

    info!("Job channel closed, download worker stopping");
}

pub fn spawn(ctx: WorkerContext, jobs: mpsc::UnboundedReceiver<Job>) -> JoinHandle<()> {
    tokio::spawn(run(ctx, jobs))
}
