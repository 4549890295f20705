//! Download directory passthrough
//!
//! Everything the tools leave in the download directory is exposed as a flat
//! list of files. Names coming from the HTTP layer must be a single path
//! component; anything else is rejected before the filesystem is touched.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::models::FileEntry;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LibraryError>;

/// Public URL prefix for served files
pub const DOWNLOAD_ROUTE: &str = "/download";

/// Link for a listed file; the name is percent-encoded as one path segment
pub fn download_path(name: &str) -> String {
    format!("{DOWNLOAD_ROUTE}/{}", urlencoding::encode(name))
}

pub fn validate_file_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || name.split('.').all(str::is_empty);

    if invalid {
        return Err(LibraryError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Absolute path of an existing regular file in `dir`
pub async fn resolve(dir: &Path, name: &str) -> Result<PathBuf> {
    validate_file_name(name)?;
    let path = dir.join(name);

    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Ok(path),
        Ok(_) => Err(LibraryError::NotFound(name.to_string())),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(LibraryError::NotFound(name.to_string())),
        Err(e) => Err(e.into()),
    }
}

/// Regular files in `dir`, sorted by name. A missing directory lists as empty.
pub async fn list(dir: &Path) -> Result<Vec<FileEntry>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let meta = match entry.metadata().await {
            Ok(meta) => meta,
            Err(e) => {
                debug!(path = %entry.path().display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !meta.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        files.push(FileEntry {
            path: download_path(&name),
            name,
            size: meta.len(),
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

pub async fn delete(dir: &Path, name: &str) -> Result<()> {
    let path = resolve(dir, name).await?;
    tokio::fs::remove_file(&path).await?;
    info!(path = %path.display(), "Deleted download");
    Ok(())
}

/// Remove every regular file in `dir`, returning how many went away
pub async fn clear(dir: &Path) -> Result<usize> {
    let mut deleted = 0;
    for file in list(dir).await? {
        let path = dir.join(&file.name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => deleted += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete download"),
        }
    }

    info!(dir = %dir.display(), deleted, "Cleared downloads");
    Ok(deleted)
}

/// Most recently modified file whose stem ends with `_<suffix>` and whose
/// extension is `ext`
pub async fn latest_matching(dir: &Path, suffix: &str, ext: &str) -> Result<Option<PathBuf>> {
    let wanted = format!("_{suffix}.{ext}");
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    for file in list(dir).await? {
        if !file.name.ends_with(&wanted) {
            continue;
        }
        let path = dir.join(&file.name);
        let modified = tokio::fs::metadata(&path)
            .await?
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH);

        if newest.as_ref().is_none_or(|(at, _)| modified >= *at) {
            newest = Some((modified, path));
        }
    }

    Ok(newest.map(|(_, path)| path))
}
