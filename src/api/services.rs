use axum::{
    Json,
    body::Body,
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::collections::HashMap;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{info, warn};

use super::{
    models::{
        ClearResponse, DeleteResponse, DownloadAccepted, DownloadRequest, HealthResponse,
        PresetInfo, StatusRecord, VideoInfoRequest,
    },
    state::AppState,
    utils::{content_disposition, read_json},
    validation::{self, DownloadValidationError},
};
use crate::api::error::ApiError;
use crate::library;
use crate::presets::PRESETS;

/// Download submission endpoint (POST /api/download)
///
/// ## Flow:
/// 1. Validate Content-Type, read the body within `server.max_payload_bytes`
/// 2. Deserialize and validate the request (urls, type, quality, speed)
/// 3. Persist one job per URL and write its `queued` status before the
///    worker can pick it up; 503 with nothing persisted if the worker is gone
/// 4. Return 202 Accepted with one id per URL, in submission order
pub async fn submit_download(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, ApiError> {
    let limit = state.config.server.max_payload_bytes.as_u64() as usize;
    let request: DownloadRequest = read_json(&headers, body, limit).await?;

    let drafts = validation::validate_download_request(
        &request,
        state.config.tools.default_rate_limit,
    )
    .map_err(map_validation_error)?;

    let jobs = state
        .broker
        .submit_all(drafts, |job| {
            let status = state.status.clone();
            async move {
                if let Err(e) = status.set_async(&job.id, StatusRecord::queued()).await {
                    warn!(job_id = %job.id, error = %e, "Failed to record queued status");
                }
            }
        })
        .await?;

    let mut download_ids = Vec::with_capacity(jobs.len());
    for job in jobs {
        info!(job_id = %job.id, url = %job.url, quality = %job.quality, mode = %job.mode, "Download queued");
        state.metrics.job_accepted();
        download_ids.push(job.id);
    }

    Ok((StatusCode::ACCEPTED, Json(DownloadAccepted { download_ids })))
}

fn map_validation_error(err: DownloadValidationError) -> ApiError {
    ApiError::InvalidPayload(err.to_string())
}

/// Status endpoint (GET /api/download-status/{id})
pub async fn download_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .status
        .get(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("download {id}")))?;

    Ok(Json(record))
}

/// GET /api/downloads
pub async fn list_downloads(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let files = library::list(&state.config.server.download_dir).await?;
    Ok(Json(files))
}

/// DELETE /api/downloads/{name}
pub async fn delete_download(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    library::delete(&state.config.server.download_dir, &name).await?;
    Ok(Json(DeleteResponse { success: true }))
}

/// POST /api/downloads/clear
pub async fn clear_downloads(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let deleted = library::clear(&state.config.server.download_dir).await?;
    Ok(Json(ClearResponse {
        success: true,
        deleted,
    }))
}

/// File download (GET /download/{name}), served as an attachment
pub async fn serve_download(
    State(state): State<AppState>,
    Path(name): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let path = library::resolve(&state.config.server.download_dir, &name).await?;

    let response = match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let mut response = response.map(Body::new);

    if response.status().is_success() {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, content_disposition(&name));
    }
    Ok(response)
}

/// GET /api/quality-presets
pub async fn quality_presets() -> impl IntoResponse {
    let presets: Vec<PresetInfo> = PRESETS
        .iter()
        .map(|preset| PresetInfo {
            id: preset.id.to_string(),
            name: preset.name.to_string(),
        })
        .collect();

    Json(presets)
}

/// Metadata lookup (POST /api/video-info)
///
/// Tool failures are reported in the body with a 200, only malformed
/// requests get an error status.
pub async fn video_info(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, ApiError> {
    let limit = state.config.server.max_payload_bytes.as_u64() as usize;
    let request: VideoInfoRequest = read_json(&headers, body, limit).await?;

    let url = request
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::InvalidPayload("No URL provided".to_string()))?;
    validation::validate_url(url).map_err(map_validation_error)?;

    match state.fetcher.probe(url).await {
        Ok(info) => Ok(Json(info).into_response()),
        Err(e) => {
            warn!(url, error = %e, "Video info lookup failed");
            Ok(Json(json!({ "error": e.to_string() })).into_response())
        }
    }
}

/// Health check endpoint (GET /health)
///
/// Components:
/// - api: Axum HTTP server
/// - job_queue: fjall-backed job queue
/// - worker: download worker channel
/// - status_store: status records
///
/// Returns 503 Service Unavailable if any component is unhealthy.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();

    let healthy = |ok: bool| (if ok { "healthy" } else { "unhealthy" }).to_string();

    components.insert("api".to_string(), healthy(true));
    components.insert(
        "job_queue".to_string(),
        healthy(state.broker.pending_count().await.is_ok()),
    );
    components.insert("worker".to_string(), healthy(state.broker.health_check()));
    components.insert(
        "status_store".to_string(),
        format!("healthy ({} records)", state.status.len()),
    );

    let all_healthy = components.values().all(|status| status.starts_with("healthy"));
    let (overall_status, status_code) = if all_healthy {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
        metrics: state.metrics.snapshot(),
    };

    (status_code, Json(response))
}
