/// File layout for status records
///
/// Each record lives at `{status_dir}/{job_id}.json`. Job ids are restricted
/// to `[A-Za-z0-9_-]` so an id can never name a path outside the directory.
use super::error::{Result, StatusError};

const RECORD_EXT: &str = ".json";
const MAX_ID_LEN: usize = 128;

pub fn validate_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(StatusError::InvalidId(id.to_string()))
    }
}

/// Encode a record file name: {job_id}.json
pub fn encode_record_file(id: &str) -> Result<String> {
    validate_id(id)?;
    Ok(format!("{id}{RECORD_EXT}"))
}

/// Decode a record file name back to its job id
pub fn decode_record_file(file_name: &str) -> Option<String> {
    let id = file_name.strip_suffix(RECORD_EXT)?;
    validate_id(id).ok()?;
    Some(id.to_string())
}
