use thiserror::Error;

use super::models::DownloadRequest;
use crate::humanize::ByteSize;
use crate::presets::{self, DownloadMode, PresetError};
use crate::queue::JobDraft;

pub const MAX_URLS_PER_REQUEST: usize = 100;
const MAX_URL_BYTES: usize = 2048;

#[derive(Debug, Error, PartialEq)]
pub enum DownloadValidationError {
    #[error("No URLs provided")]
    NoUrls,
    #[error("urls must contain at most {MAX_URLS_PER_REQUEST} entries, got {0}")]
    TooManyUrls(usize),
    #[error("'{0}' must be an http/https url")]
    InvalidUrl(String),
    #[error("url exceeds {MAX_URL_BYTES} bytes")]
    UrlTooLong,
    #[error(transparent)]
    Preset(#[from] PresetError),
}

/// One draft per URL, blank entries skipped. `speed` falls back to
/// `default_rate_limit`.
pub fn validate_download_request(
    request: &DownloadRequest,
    default_rate_limit: ByteSize,
) -> Result<Vec<JobDraft>, DownloadValidationError> {
    let mode: DownloadMode = request.download_type.parse()?;
    let preset = presets::find(&request.quality)?;
    let rate_limit = request.speed.unwrap_or(default_rate_limit);

    let urls: Vec<&str> = request
        .urls
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .collect();

    if urls.is_empty() {
        return Err(DownloadValidationError::NoUrls);
    }
    if urls.len() > MAX_URLS_PER_REQUEST {
        return Err(DownloadValidationError::TooManyUrls(urls.len()));
    }

    urls.into_iter()
        .map(|url| -> Result<JobDraft, DownloadValidationError> {
            validate_url(url)?;
            Ok(JobDraft {
                url: url.to_string(),
                mode,
                quality: preset.id.to_string(),
                rate_limit,
            })
        })
        .collect()
}

pub fn validate_url(url: &str) -> Result<(), DownloadValidationError> {
    if url.len() > MAX_URL_BYTES {
        return Err(DownloadValidationError::UrlTooLong);
    }

    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or_else(|| DownloadValidationError::InvalidUrl(url.to_string()))?;

    if rest.is_empty() || rest.starts_with('/') || url.chars().any(char::is_whitespace) {
        return Err(DownloadValidationError::InvalidUrl(url.to_string()));
    }
    Ok(())
}
