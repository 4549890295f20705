use super::models::Config;
use thiserror::Error;

/// Upper bound for `server.max_payload_bytes`
const MAX_PAYLOAD_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("max_payload_bytes ({actual}) exceeds limit of 5MB ({limit})")]
    PayloadSizeExceedsLimit { actual: u64, limit: u64 },

    #[error("max_payload_bytes must be positive")]
    InvalidPayloadSize,

    #[error("Tool path must not be empty: {field}")]
    EmptyToolPath { field: &'static str },

    #[error("Must be positive: {field} = {value}")]
    NotPositive { field: &'static str, value: u64 },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_payload_size(config)?;
    validate_tools(config)?;
    validate_retention(config)?;
    Ok(())
}

fn validate_payload_size(config: &Config) -> Result<(), ValidationError> {
    let actual = config.server.max_payload_bytes.as_u64();
    if actual == 0 {
        return Err(ValidationError::InvalidPayloadSize);
    }
    if actual > MAX_PAYLOAD_BYTES {
        return Err(ValidationError::PayloadSizeExceedsLimit {
            actual,
            limit: MAX_PAYLOAD_BYTES,
        });
    }
    Ok(())
}

fn validate_tools(config: &Config) -> Result<(), ValidationError> {
    if config.tools.ytdlp_path.as_os_str().is_empty() {
        return Err(ValidationError::EmptyToolPath {
            field: "tools.ytdlp_path",
        });
    }
    if config.tools.ffmpeg_path.as_os_str().is_empty() {
        return Err(ValidationError::EmptyToolPath {
            field: "tools.ffmpeg_path",
        });
    }
    positive("tools.socket_timeout_secs", config.tools.socket_timeout_secs)
}

fn validate_retention(config: &Config) -> Result<(), ValidationError> {
    positive("retention.status_ttl_hours", config.retention.status_ttl_hours)?;
    positive(
        "retention.sweep_interval_secs",
        config.retention.sweep_interval_secs,
    )
}

fn positive(field: &'static str, value: u64) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::NotPositive { field, value });
    }
    Ok(())
}
