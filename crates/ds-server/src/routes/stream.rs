//! Stream access route handlers.
//!
//! Locations are returned as JSON strings, frame URIs as a JSON array.
//! Every error body carries the request id.

use axum::extract::{Path, State};
use axum::Json;

use ds_core::DeviceId;

use crate::context::AppContext;
use crate::error::{AppError, WithRequestId};
use crate::middleware::request_id::RequestId;

fn parse_device(raw: &str) -> ds_core::Result<DeviceId> {
    raw.parse()
        .map_err(|_| ds_core::Error::Validation(format!("Invalid device id: {raw}")))
}

fn parse_count(raw: &str) -> ds_core::Result<i64> {
    raw.parse()
        .map_err(|_| ds_core::Error::Validation(format!("Invalid frame count: {raw}")))
}

/// GET /api/stream/{id}/dash
#[utoipa::path(
    get,
    path = "/api/stream/{id}/dash",
    params(("id" = String, Path, description = "Device ID (UUID)")),
    responses(
        (status = 200, description = "DASH manifest location", body = String),
        (status = 400, description = "Malformed device id"),
        (status = 404, description = "Manifest not available")
    )
)]
pub async fn dash_manifest(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    request_id: RequestId,
) -> Result<Json<String>, AppError> {
    let device = parse_device(&id).for_request(&request_id)?;
    let location = ctx
        .streams
        .get_dash_manifest(device)
        .await
        .for_request(&request_id)?;
    Ok(Json(location.location))
}

/// GET /api/stream/{id}/hls
#[utoipa::path(
    get,
    path = "/api/stream/{id}/hls",
    params(("id" = String, Path, description = "Device ID (UUID)")),
    responses(
        (status = 200, description = "HLS manifest location", body = String),
        (status = 400, description = "Malformed device id"),
        (status = 404, description = "Manifest not available")
    )
)]
pub async fn hls_manifest(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    request_id: RequestId,
) -> Result<Json<String>, AppError> {
    let device = parse_device(&id).for_request(&request_id)?;
    let location = ctx
        .streams
        .get_hls_manifest(device)
        .await
        .for_request(&request_id)?;
    Ok(Json(location.location))
}

/// GET /api/stream/{id}/rtmp
#[utoipa::path(
    get,
    path = "/api/stream/{id}/rtmp",
    params(("id" = String, Path, description = "Device ID (UUID)")),
    responses(
        (status = 200, description = "RTMP location", body = String),
        (status = 400, description = "Malformed device id")
    )
)]
pub async fn rtmp_location(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    request_id: RequestId,
) -> Result<Json<String>, AppError> {
    let device = parse_device(&id).for_request(&request_id)?;
    Ok(Json(ctx.streams.get_rtmp_location(device).location))
}

/// GET /api/stream/{id}/frames/{count}
#[utoipa::path(
    get,
    path = "/api/stream/{id}/frames/{count}",
    params(
        ("id" = String, Path, description = "Device ID (UUID)"),
        ("count" = i64, Path, description = "Number of frames to extract")
    ),
    responses(
        (status = 200, description = "Frame URIs in sequence order", body = Vec<String>),
        (status = 400, description = "Invalid count or extraction failed"),
        (status = 404, description = "Device not found or not streaming")
    )
)]
pub async fn frames(
    State(ctx): State<AppContext>,
    Path((id, count)): Path<(String, String)>,
    request_id: RequestId,
) -> Result<Json<Vec<String>>, AppError> {
    let device = parse_device(&id).for_request(&request_id)?;
    let count = parse_count(&count).for_request(&request_id)?;
    let uris = ctx
        .streams
        .get_frames(device, count)
        .await
        .for_request(&request_id)?;
    Ok(Json(uris))
}
