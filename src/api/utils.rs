//! Request and response helpers shared by the handlers

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, header},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde::de::DeserializeOwned;

use crate::api::error::ApiError;

/// Checks that the request declares a JSON body.
///
/// Parameters such as `charset` are allowed; `application/jsonp`,
/// `application/json-patch+json` and `text/json` are not.
pub fn require_json(headers: &HeaderMap) -> Result<(), ApiError> {
    let raw = headers
        .get(header::CONTENT_TYPE)
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?
        .to_str()
        .map_err(|_| ApiError::InvalidPayload("Content-Type is not valid ASCII".into()))?;

    let media: mime::Mime = raw
        .parse()
        .map_err(|_| ApiError::InvalidPayload(format!("invalid Content-Type: {raw}")))?;

    if media.type_() == mime::APPLICATION && media.subtype() == mime::JSON {
        Ok(())
    } else {
        Err(ApiError::InvalidPayload(format!(
            "Content-Type must be application/json, got: {}",
            media.essence_str()
        )))
    }
}

/// Reads a JSON body no larger than `limit` bytes
///
/// Decompression is handled by RequestDecompressionLayer, so the limit
/// applies to the decoded payload.
pub async fn read_json<T: DeserializeOwned>(
    headers: &HeaderMap,
    body: Body,
    limit: usize,
) -> Result<T, ApiError> {
    require_json(headers)?;

    let bytes = Limited::new(body, limit)
        .collect()
        .await
        .map_err(|err| {
            if err.downcast_ref::<LengthLimitError>().is_some() {
                ApiError::PayloadTooLarge(limit)
            } else {
                ApiError::InvalidPayload(format!("failed to read body: {err}"))
            }
        })?
        .to_bytes();

    Ok(serde_json::from_slice(&bytes)?)
}

pub fn content_disposition(name: &str) -> HeaderValue {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_str(&format!("attachment; filename=\"{escaped}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
