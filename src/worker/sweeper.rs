//! Periodic TTL sweep of the status store

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::status::{PruneStats, StatusStore};

pub fn spawn(status: Arc<StatusStore>, ttl: Duration, every: Duration) -> JoinHandle<()> {
    info!(ttl_secs = ttl.as_secs(), every_secs = every.as_secs(), "Starting status sweeper");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            sweep_once(status.clone(), ttl).await;
        }
    })
}

pub async fn sweep_once(status: Arc<StatusStore>, ttl: Duration) -> Option<PruneStats> {
    let result = tokio::task::spawn_blocking(move || status.prune_expired(ttl)).await;

    match result {
        Ok(Ok(stats)) => {
            debug!(?stats, "Status sweep finished");
            Some(stats)
        }
        Ok(Err(e)) => {
            warn!(error = %e, "Status sweep failed");
            None
        }
        Err(e) => {
            warn!(error = %e, "Status sweep task panicked");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::StatusRecord;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sweep_once_prunes_expired() {
        let tmp = TempDir::new().unwrap();
        let status = Arc::new(StatusStore::open(tmp.path()).unwrap());

        let mut stale = StatusRecord::queued();
        stale.updated_at = chrono::Utc::now() - chrono::Duration::hours(25);
        status.set("download_1", stale).unwrap();
        status.set("download_2", StatusRecord::queued()).unwrap();

        let stats = sweep_once(status.clone(), Duration::from_secs(24 * 3600))
            .await
            .unwrap();

        assert_eq!(stats.records_pruned, 1);
        assert!(status.get("download_1").unwrap().is_none());
        assert!(status.get("download_2").unwrap().is_some());
    }
}
