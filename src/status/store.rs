use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::models::StatusRecord;

use super::error::Result;
use super::paths::{decode_record_file, encode_record_file, validate_id};
use super::pruning::{PruneStats, prune_expired};

/// Job status records, one JSON file per job id plus an in-memory mirror
///
/// Writes are last-write-wins. A failed file write keeps the record in
/// memory only; reads check memory first and fall back to the file.
pub struct StatusStore {
    dir: PathBuf,
    records: Mutex<HashMap<String, StatusRecord>>,
}

impl StatusStore {
    /// Open the status directory and load every readable record into memory
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        info!(path = %dir.display(), "Opening status store");
        std::fs::create_dir_all(&dir)?;

        let mut records = HashMap::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let Some(id) = entry.file_name().to_str().and_then(decode_record_file) else {
                continue;
            };
            match read_record(&entry.path()) {
                Ok(record) => {
                    records.insert(id, record);
                }
                Err(e) => warn!(path = %entry.path().display(), error = %e, "Skipping unreadable status record"),
            }
        }

        info!(count = records.len(), "Status store opened");
        Ok(Self {
            dir,
            records: Mutex::new(records),
        })
    }

    pub fn set(&self, id: &str, record: StatusRecord) -> Result<()> {
        let file_name = encode_record_file(id)?;
        let path = self.dir.join(file_name);

        match serde_json::to_vec(&record) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(&path, bytes) {
                    warn!(job_id = id, error = %e, "Status file write failed, keeping record in memory");
                }
            }
            Err(e) => warn!(job_id = id, error = %e, "Status record encoding failed"),
        }

        debug!(job_id = id, status = ?record.status, progress = record.progress, "Status updated");
        self.records().insert(id.to_string(), record);
        Ok(())
    }

    /// [`set`](Self::set) on the blocking pool, for callers on the runtime
    pub async fn set_async(self: &Arc<Self>, id: &str, record: StatusRecord) -> Result<()> {
        let store = Arc::clone(self);
        let id = id.to_string();
        tokio::task::spawn_blocking(move || store.set(&id, record))
            .await
            .map_err(std::io::Error::other)?
    }

    pub fn get(&self, id: &str) -> Result<Option<StatusRecord>> {
        validate_id(id)?;

        if let Some(record) = self.records().get(id) {
            return Ok(Some(record.clone()));
        }

        let path = self.dir.join(encode_record_file(id)?);
        if !path.exists() {
            return Ok(None);
        }

        let record = read_record(&path)?;
        self.records().insert(id.to_string(), record.clone());
        Ok(Some(record))
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete records not updated within `ttl`
    pub fn prune_expired(&self, ttl: Duration) -> Result<PruneStats> {
        let mut records = self.records();
        let stats = prune_expired(&self.dir, &mut records, ttl)?;
        if stats.total() > 0 {
            info!(?stats, "Pruned expired status records");
        }
        Ok(stats)
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, StatusRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(super) fn read_record(path: &Path) -> Result<StatusRecord> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}
