use crate::queue::job::{Job, JobDraft};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("Job encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Job not found: seq={0}")]
    JobNotFound(u64),

    #[error("Worker channel closed")]
    WorkerGone,
}

pub type Result<T> = std::result::Result<T, QueueError>;

const NEXT_SEQ_KEY: &[u8] = b"next_seq";

/// Durable FIFO of jobs that have not reached a terminal status yet
///
/// Layout:
/// - `jobs` partition: u64 (big-endian) → Job (JSON)
/// - `metadata` partition: "next_seq" → u64
///
/// Big-endian keys make partition iteration follow submission order. The
/// counter is never rewound, so job ids stay unique after entries are acked.
pub struct JobQueue {
    keyspace: Keyspace,
    jobs: PartitionHandle,
    metadata: PartitionHandle,
    seq_counter: AtomicU64,
}

impl JobQueue {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!(path = %path.as_ref().display(), "Opening job queue");

        let keyspace = Config::new(path).open()?;
        let jobs = keyspace.open_partition("jobs", PartitionCreateOptions::default())?;
        let metadata = keyspace.open_partition("metadata", PartitionCreateOptions::default())?;

        let current_seq = metadata
            .get(NEXT_SEQ_KEY)?
            .map(|bytes| u64::from_be_bytes(bytes.as_ref().try_into().unwrap_or([0u8; 8])))
            .unwrap_or(0);

        info!(next_seq = current_seq, "Job queue opened");

        Ok(Self {
            keyspace,
            jobs,
            metadata,
            seq_counter: AtomicU64::new(current_seq),
        })
    }

    /// Assign the next sequence number and persist the job
    pub fn enqueue(&self, draft: JobDraft) -> Result<Job> {
        let seq = self.seq_counter.fetch_add(1, Ordering::SeqCst);
        let job = Job::from_draft(seq, draft);

        self.jobs.insert(seq.to_be_bytes(), serde_json::to_vec(&job)?)?;
        self.metadata.insert(NEXT_SEQ_KEY, (seq + 1).to_be_bytes())?;

        debug!(seq, job_id = %job.id, "Job persisted");
        Ok(job)
    }

    /// Drop a job that reached a terminal status
    pub fn ack(&self, seq: u64) -> Result<()> {
        if self.jobs.get(seq.to_be_bytes())?.is_none() {
            return Err(QueueError::JobNotFound(seq));
        }
        self.jobs.remove(seq.to_be_bytes())?;
        debug!(seq, "Job acked");
        Ok(())
    }

    /// Unacked jobs in submission order
    pub fn pending(&self) -> Result<Vec<Job>> {
        let mut pending = Vec::new();
        for item in self.jobs.iter() {
            let (_, value) = item?;
            pending.push(serde_json::from_slice(&value)?);
        }
        Ok(pending)
    }

    pub fn flush(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }
}
