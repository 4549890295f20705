/// Age-based expiry of status records
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::api::models::StatusRecord;

use super::error::Result;
use super::paths::{decode_record_file, encode_record_file};

/// Default status retention (hours)
pub const STATUS_TTL_HOURS: u64 = 24;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PruneStats {
    /// Records expired by their `updated_at`
    pub records_pruned: usize,
    /// Unreadable files expired by modification time
    pub orphans_pruned: usize,
}

impl PruneStats {
    pub fn total(&self) -> usize {
        self.records_pruned + self.orphans_pruned
    }
}

pub fn prune_expired(
    dir: &Path,
    records: &mut HashMap<String, StatusRecord>,
    ttl: Duration,
) -> Result<PruneStats> {
    let mut stats = PruneStats::default();
    let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
    let cutoff = chrono::Utc::now()
        .checked_sub_signed(ttl)
        .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);

    let expired: Vec<String> = records
        .iter()
        .filter(|(_, record)| record.updated_at < cutoff)
        .map(|(id, _)| id.clone())
        .collect();

    for id in expired {
        records.remove(&id);
        remove_if_present(&dir.join(encode_record_file(&id)?))?;
        debug!(job_id = %id, "Expired status record");
        stats.records_pruned += 1;
    }

    stats.orphans_pruned = prune_orphans(dir, records, cutoff)?;
    Ok(stats)
}

/// Files on disk with no in-memory record (unreadable at load) age out by mtime
fn prune_orphans(
    dir: &Path,
    records: &HashMap<String, StatusRecord>,
    cutoff: chrono::DateTime<chrono::Utc>,
) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let cutoff: SystemTime = cutoff.into();
    let mut pruned = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let Some(id) = entry.file_name().to_str().and_then(decode_record_file) else {
            continue;
        };
        if records.contains_key(&id) {
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        if modified < cutoff {
            remove_if_present(&entry.path())?;
            debug!(job_id = %id, "Expired orphaned status file");
            pruned += 1;
        }
    }

    Ok(pruned)
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
