//! Image validation endpoint

use crate::error::{ApiError, ApiResult};
use crate::types::{
    Decision, GeoPoint, ReasonCode, SignalSet, ValidationRequest, ValidationStatus,
};
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ValidateBody {
    /// Path of the already-stored image to validate.
    pub image_path: String,
    /// Issue category declared by the reporter.
    pub issue_type: String,
    #[serde(default)]
    pub issue_id: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub validation_id: String,
    pub created_at: DateTime<Utc>,
    pub status: ValidationStatus,
    pub reason_codes: Vec<ReasonCode>,
    pub confidence_score: f64,
    pub message: String,
    pub signals: SignalSet,
}

impl ValidateResponse {
    fn new(validation_id: String, created_at: DateTime<Utc>, decision: Decision) -> Self {
        Self {
            validation_id,
            created_at,
            status: decision.status,
            reason_codes: decision.reason_codes,
            confidence_score: decision.confidence_score,
            message: decision.message,
            signals: decision.signals,
        }
    }
}

/// POST /validate
///
/// Runs the full validation pipeline for one image. A `rejected` verdict
/// is a successful (200) response; only an unusable request fails.
pub async fn validate(
    State(state): State<AppState>,
    Json(body): Json<ValidateBody>,
) -> ApiResult<Json<ValidateResponse>> {
    if body.issue_type.trim().is_empty() {
        return Err(ApiError::BadRequest("issue_type must not be empty".to_string()));
    }

    let claimed_location = match (body.latitude, body.longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint {
            latitude,
            longitude,
        }),
        (None, None) => None,
        _ => {
            return Err(ApiError::BadRequest(
                "latitude and longitude must be supplied together".to_string(),
            ))
        }
    };

    let request = ValidationRequest {
        image_path: body.image_path.into(),
        issue_type: body.issue_type,
        issue_id: body.issue_id,
        claimed_location,
        description: body.description,
    };

    let outcome = match state.pipeline.validate(&request).await {
        Ok(outcome) => outcome,
        Err(cpv_common::Error::InvalidInput(msg)) => return Err(ApiError::BadRequest(msg)),
        Err(e) => {
            *state.last_error.write().await = Some(e.to_string());
            return Err(ApiError::Common(e));
        }
    };

    Ok(Json(ValidateResponse::new(
        outcome.validation_id,
        outcome.created_at,
        outcome.decision,
    )))
}

/// Build validation routes
pub fn validate_routes() -> Router<AppState> {
    Router::new().route("/validate", post(validate))
}
