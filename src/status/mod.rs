/// Persistent progress state for download jobs
///
/// Every job id maps to one [`StatusRecord`](crate::api::models::StatusRecord)
/// that the worker overwrites as the job advances and the API serves to
/// pollers. Records are written as one JSON file per id so they survive a
/// restart, and mirrored in a mutex-guarded map for fast reads.
///
/// ## Retention
///
/// Records expire 24h after their last update (configurable through
/// `retention.status_ttl_hours`). The server runs [`StatusStore::prune_expired`]
/// on a background interval; `mediabox prune` runs it once.
///
/// ## Durability
///
/// File writes are plain overwrites, not atomic renames. A crash mid-write
/// can leave a truncated file; such files are skipped on load and aged out
/// by modification time.

pub mod error;
pub mod paths;
pub mod pruning;
pub mod store;

pub use error::{Result, StatusError};
pub use pruning::{PruneStats, STATUS_TTL_HOURS};
pub use store::StatusStore;
