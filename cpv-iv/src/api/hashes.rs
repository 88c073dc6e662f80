//! Fingerprint corpus endpoints
//!
//! Called by the complaint service: register a fingerprint when a
//! complaint is filed (Pending), transition it when the complaint is
//! resolved or rejected. Resolution is what makes a record eligible as a
//! duplicate reference.

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{post, put},
    Json, Router,
};
use cpv_common::db::models::HashStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RegisterHashBody {
    pub issue_id: String,
    pub image_path: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterHashResponse {
    pub issue_id: String,
    pub phash: String,
    pub status: HashStatus,
}

/// POST /hashes
///
/// Fingerprint the image and store it for the issue (upsert, Pending).
pub async fn register_hash(
    State(state): State<AppState>,
    Json(body): Json<RegisterHashBody>,
) -> ApiResult<Json<RegisterHashResponse>> {
    if body.issue_id.trim().is_empty() {
        return Err(ApiError::BadRequest("issue_id must not be empty".to_string()));
    }

    let phash = match state
        .pipeline
        .register_fingerprint(&body.issue_id, std::path::Path::new(&body.image_path))
        .await
    {
        Ok(phash) => phash,
        Err(cpv_common::Error::InvalidInput(msg)) => return Err(ApiError::BadRequest(msg)),
        Err(e) => return Err(ApiError::Common(e)),
    };

    Ok(Json(RegisterHashResponse {
        issue_id: body.issue_id,
        phash,
        status: HashStatus::Pending,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: HashStatus,
}

#[derive(Debug, Serialize)]
pub struct UpdateStatusResponse {
    pub issue_id: String,
    pub status: HashStatus,
}

/// PUT /hashes/:issue_id/status
///
/// Lifecycle transition for a stored fingerprint.
pub async fn update_hash_status(
    State(state): State<AppState>,
    Path(issue_id): Path<String>,
    Json(body): Json<UpdateStatusBody>,
) -> ApiResult<Json<UpdateStatusResponse>> {
    state
        .pipeline
        .hash_store()
        .set_status(&issue_id, body.status)
        .await?;

    Ok(Json(UpdateStatusResponse {
        issue_id,
        status: body.status,
    }))
}

/// Build hash corpus routes
pub fn hash_routes() -> Router<AppState> {
    Router::new()
        .route("/hashes", post(register_hash))
        .route("/hashes/:issue_id/status", put(update_hash_status))
}
