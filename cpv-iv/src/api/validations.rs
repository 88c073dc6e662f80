//! Validation audit record retrieval
//!
//! Audit records are append-only; these endpoints are read-only views over
//! them for inspection and reproducibility.

use crate::db::validations::ValidationRecord;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Audit record with the stored JSON snapshots expanded.
#[derive(Debug, Serialize)]
pub struct AuditRecordResponse {
    pub validation_id: String,
    pub created_at: String,
    pub image_path: String,
    pub issue_id: Option<String>,
    pub issue_type: String,
    pub status: String,
    pub reason_codes: Value,
    pub confidence_score: f64,
    pub message: String,
    pub signals: AuditSignals,
}

#[derive(Debug, Serialize)]
pub struct AuditSignals {
    pub ai: Value,
    pub exif: Value,
    pub hash: Value,
    pub issue_match: Value,
}

impl From<ValidationRecord> for AuditRecordResponse {
    fn from(record: ValidationRecord) -> Self {
        Self {
            validation_id: record.validation_id,
            created_at: record.created_at,
            image_path: record.image_path,
            issue_id: record.issue_id,
            issue_type: record.issue_type,
            status: record.status,
            reason_codes: parse_snapshot(&record.reason_codes),
            confidence_score: record.confidence_score,
            message: record.message,
            signals: AuditSignals {
                ai: parse_snapshot(&record.ai_signal),
                exif: parse_snapshot(&record.exif_signal),
                hash: parse_snapshot(&record.hash_signal),
                issue_match: parse_snapshot(&record.issue_match_signal),
            },
        }
    }
}

fn parse_snapshot(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or(Value::Null)
}

/// GET /validations/:validation_id
pub async fn get_validation(
    State(state): State<AppState>,
    Path(validation_id): Path<String>,
) -> ApiResult<Json<AuditRecordResponse>> {
    let record = crate::db::validations::get(&state.db, &validation_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("validation {}", validation_id)))?;

    Ok(Json(record.into()))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub issue_id: Option<String>,
    pub status: Option<String>,
}

/// GET /validations?issue_id=&status=
pub async fn list_validations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<AuditRecordResponse>>> {
    let records = crate::db::validations::list(
        &state.db,
        params.issue_id.as_deref(),
        params.status.as_deref(),
    )
    .await?;

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// Build audit record routes
pub fn validation_routes() -> Router<AppState> {
    Router::new()
        .route("/validations", get(list_validations))
        .route("/validations/:validation_id", get(get_validation))
}
