//! Query helpers for the `image_validations` audit table
//!
//! Append-only: records are inserted once per validation run and never
//! updated, so a decision can always be reproduced from its inputs.

use crate::types::{Decision, ValidationRequest};
use chrono::{DateTime, Utc};
use cpv_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;

/// One persisted audit row. Signal snapshots are stored as JSON text.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ValidationRecord {
    pub validation_id: String,
    pub created_at: String,
    pub image_path: String,
    pub issue_id: Option<String>,
    pub issue_type: String,
    pub status: String,
    pub reason_codes: String,
    pub confidence_score: f64,
    pub message: String,
    pub ai_signal: String,
    pub exif_signal: String,
    pub hash_signal: String,
    pub issue_match_signal: String,
}

const COLUMNS: &str = "validation_id, created_at, image_path, issue_id, issue_type, status, \
     reason_codes, confidence_score, message, ai_signal, exif_signal, hash_signal, \
     issue_match_signal";

/// Persist one decision with every input signal verbatim.
pub async fn insert(
    db: &SqlitePool,
    validation_id: &str,
    created_at: DateTime<Utc>,
    request: &ValidationRequest,
    decision: &Decision,
) -> Result<()> {
    let reason_codes = to_json(&decision.reason_codes)?;
    let ai_signal = to_json(&decision.signals.ai)?;
    let exif_signal = to_json(&decision.signals.exif)?;
    let hash_signal = to_json(&decision.signals.hash)?;
    let issue_match_signal = to_json(&decision.signals.issue_match)?;

    sqlx::query(
        r#"
        INSERT INTO image_validations
            (validation_id, created_at, image_path, issue_id, issue_type, status,
             reason_codes, confidence_score, message,
             ai_signal, exif_signal, hash_signal, issue_match_signal)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(validation_id)
    .bind(created_at.to_rfc3339())
    .bind(request.image_path.display().to_string())
    .bind(&request.issue_id)
    .bind(&request.issue_type)
    .bind(decision.status.as_str())
    .bind(reason_codes)
    .bind(decision.confidence_score)
    .bind(&decision.message)
    .bind(ai_signal)
    .bind(exif_signal)
    .bind(hash_signal)
    .bind(issue_match_signal)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn get(db: &SqlitePool, validation_id: &str) -> Result<Option<ValidationRecord>> {
    let record = sqlx::query_as::<_, ValidationRecord>(&format!(
        "SELECT {} FROM image_validations WHERE validation_id = ?",
        COLUMNS
    ))
    .bind(validation_id)
    .fetch_optional(db)
    .await?;

    Ok(record)
}

/// List audit records, newest first, optionally filtered by issue and/or
/// decision status.
pub async fn list(
    db: &SqlitePool,
    issue_id: Option<&str>,
    status: Option<&str>,
) -> Result<Vec<ValidationRecord>> {
    let records = match (issue_id, status) {
        (Some(issue_id), Some(status)) => {
            sqlx::query_as::<_, ValidationRecord>(&format!(
                "SELECT {} FROM image_validations WHERE issue_id = ? AND status = ? \
                 ORDER BY created_at DESC",
                COLUMNS
            ))
            .bind(issue_id)
            .bind(status)
            .fetch_all(db)
            .await?
        }
        (Some(issue_id), None) => {
            sqlx::query_as::<_, ValidationRecord>(&format!(
                "SELECT {} FROM image_validations WHERE issue_id = ? ORDER BY created_at DESC",
                COLUMNS
            ))
            .bind(issue_id)
            .fetch_all(db)
            .await?
        }
        (None, Some(status)) => {
            sqlx::query_as::<_, ValidationRecord>(&format!(
                "SELECT {} FROM image_validations WHERE status = ? ORDER BY created_at DESC",
                COLUMNS
            ))
            .bind(status)
            .fetch_all(db)
            .await?
        }
        (None, None) => {
            sqlx::query_as::<_, ValidationRecord>(&format!(
                "SELECT {} FROM image_validations ORDER BY created_at DESC",
                COLUMNS
            ))
            .fetch_all(db)
            .await?
        }
    };

    Ok(records)
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Internal(format!("serialize snapshot: {}", e)))
}
