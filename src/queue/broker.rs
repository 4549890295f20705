use crate::queue::job::{Job, JobDraft};
use crate::queue::store::{JobQueue, QueueError};
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

/// JobBroker hands submitted jobs to the single download worker
///
/// Flow:
/// 1. API calls `broker.submit_all(drafts, before_send)`
/// 2. Broker refuses the whole batch if the worker is gone
/// 3. Each job is persisted to JobQueue (assigns seq and id), `before_send`
///    runs, then the job goes over the worker channel
/// 4. Worker calls `broker.ack(seq)` once the job reached a terminal status
///
/// The batch runs under one write lock, so channel order always matches id
/// order when requests race.
pub struct JobBroker {
    queue: Arc<RwLock<JobQueue>>,
    worker_tx: mpsc::UnboundedSender<Job>,
}

impl JobBroker {
    /// Returns the broker and the receiving end for the worker
    pub fn new(queue: Arc<RwLock<JobQueue>>) -> (Self, mpsc::UnboundedReceiver<Job>) {
        let (worker_tx, worker_rx) = mpsc::unbounded_channel();
        info!("Creating JobBroker with single worker channel");
        (Self { queue, worker_tx }, worker_rx)
    }

    pub async fn submit(&self, draft: JobDraft) -> Result<Job, QueueError> {
        let queue = self.queue.write().await;
        self.ensure_worker()?;
        let job = queue.enqueue(draft)?;
        self.deliver(&job);
        Ok(job)
    }

    /// Persist and deliver every draft, awaiting `before_send` on each job
    /// before the worker can see it. Nothing is persisted when the worker is
    /// already gone.
    pub async fn submit_all<F, Fut>(&self, drafts: Vec<JobDraft>, mut before_send: F) -> Result<Vec<Job>, QueueError>
    where
        F: FnMut(Job) -> Fut,
        Fut: Future<Output = ()>,
    {
        let queue = self.queue.write().await;
        self.ensure_worker()?;

        let mut jobs = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let job = queue.enqueue(draft)?;
            before_send(job.clone()).await;
            self.deliver(&job);
            jobs.push(job);
        }
        Ok(jobs)
    }

    fn ensure_worker(&self) -> Result<(), QueueError> {
        if self.worker_tx.is_closed() {
            warn!("Worker channel closed, rejecting submission");
            return Err(QueueError::WorkerGone);
        }
        Ok(())
    }

    fn deliver(&self, job: &Job) {
        if self.worker_tx.send(job.clone()).is_err() {
            // Persisted, so the next start re-dispatches it
            warn!(job_id = %job.id, "Worker channel closed, job left for recovery");
        } else {
            debug!(job_id = %job.id, url = %job.url, "Job sent to worker");
        }
    }

    /// Re-dispatch jobs left unacked by a previous run, in submission order
    pub async fn recover(&self) -> Result<Vec<Job>, QueueError> {
        let queue = self.queue.write().await;
        let pending = queue.pending()?;

        for job in &pending {
            self.worker_tx
                .send(job.clone())
                .map_err(|_| QueueError::WorkerGone)?;
        }

        if !pending.is_empty() {
            info!(count = pending.len(), "Recovered unfinished jobs");
        }
        Ok(pending)
    }

    pub async fn ack(&self, seq: u64) -> Result<(), QueueError> {
        self.queue.read().await.ack(seq)
    }

    pub async fn pending_count(&self) -> Result<usize, QueueError> {
        Ok(self.queue.read().await.pending()?.len())
    }

    pub fn health_check(&self) -> bool {
        !self.worker_tx.is_closed()
    }
}
