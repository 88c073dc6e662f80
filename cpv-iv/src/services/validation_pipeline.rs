//! Validation pipeline orchestrator
//!
//! Gathers the four authenticity signals for one image concurrently,
//! folds them into a decision, and persists the audit record. Adapter
//! failures and timeouts degrade to skipped signals; only an unreadable
//! image aborts a request.

use crate::config::ValidationConfig;
use crate::extractors::ExifExtractor;
use crate::services::decision_engine::{decide, DecisionPolicy};
use crate::services::fingerprinter::Fingerprinter;
use crate::services::geocoder::ReverseGeocoder;
use crate::services::hash_store::HashStore;
use crate::types::{
    AiDetector, AiSignal, Decision, ExifSignal, HashSignal, IssueMatchSignal, ValidationRequest,
    VisionClassifier,
};
use chrono::{DateTime, Utc};
use cpv_common::db::models::HashStatus;
use cpv_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of one validation run: the decision plus its audit identity.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    pub validation_id: String,
    pub created_at: DateTime<Utc>,
    pub decision: Decision,
}

/// Orchestrates signal gathering and the decision fold for one service.
pub struct ValidationPipeline {
    db: SqlitePool,
    exif_extractor: ExifExtractor,
    fingerprinter: Arc<Fingerprinter>,
    hash_store: HashStore,
    ai_detector: Arc<dyn AiDetector>,
    vision_classifier: Arc<dyn VisionClassifier>,
    geocoder: Option<ReverseGeocoder>,
    policy: DecisionPolicy,
    adapter_timeout: Duration,
}

impl ValidationPipeline {
    pub fn new(
        db: SqlitePool,
        config: &ValidationConfig,
        ai_detector: Arc<dyn AiDetector>,
        vision_classifier: Arc<dyn VisionClassifier>,
    ) -> Self {
        let geocoder = if config.geocoding_enabled {
            match ReverseGeocoder::new(config.adapter_timeout()) {
                Ok(geocoder) => Some(geocoder),
                Err(e) => {
                    warn!(error = %e, "reverse geocoder unavailable, addresses disabled");
                    None
                }
            }
        } else {
            None
        };

        Self {
            hash_store: HashStore::new(db.clone(), config.hash_distance_threshold),
            db,
            exif_extractor: ExifExtractor::new(config.location_radius_km),
            fingerprinter: Arc::new(Fingerprinter::new()),
            ai_detector,
            vision_classifier,
            geocoder,
            policy: DecisionPolicy {
                strict_exif_required: config.strict_exif_required,
                location_radius_km: config.location_radius_km,
            },
            adapter_timeout: config.adapter_timeout(),
        }
    }

    pub fn hash_store(&self) -> &HashStore {
        &self.hash_store
    }

    /// Run one validation: gather signals concurrently, decide, persist.
    ///
    /// Fails only on invalid input (unreadable/undecodable image) or on
    /// audit-record persistence; adapter trouble degrades to skipped
    /// signals and never aborts the request.
    pub async fn validate(&self, request: &ValidationRequest) -> Result<ValidationOutcome> {
        info!(
            image = %request.image_path.display(),
            issue_type = %request.issue_type,
            "starting validation"
        );

        // Decode-and-fingerprint doubles as the readability gate: an
        // unusable image is a request failure, not a degraded decision.
        let fingerprint = {
            let fingerprinter = Arc::clone(&self.fingerprinter);
            let path = request.image_path.clone();
            tokio::task::spawn_blocking(move || fingerprinter.fingerprint_file(&path))
                .await
                .map_err(|e| Error::Internal(format!("fingerprint task failed: {}", e)))??
        };

        let ai_future = async {
            match timeout(self.adapter_timeout, self.ai_detector.analyze(&request.image_path))
                .await
            {
                Ok(signal) => signal,
                Err(_) => {
                    warn!(adapter = self.ai_detector.name(), "AI detection timed out");
                    AiSignal::skipped("timed out")
                }
            }
        };

        let vision_future = async {
            match timeout(self.adapter_timeout, self.vision_classifier.analyze(request)).await {
                Ok(signal) => signal,
                Err(_) => {
                    warn!(adapter = self.vision_classifier.name(), "vision analysis timed out");
                    IssueMatchSignal::skipped(&request.issue_type, "timed out")
                }
            }
        };

        let exif_future = async {
            let extractor = self.exif_extractor;
            let path = request.image_path.clone();
            let claimed = request.claimed_location;
            tokio::task::spawn_blocking(move || extractor.extract(&path, claimed))
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "EXIF extraction task failed");
                    ExifSignal::default()
                })
        };

        let hash_future = async {
            match self.hash_store.check(&fingerprint).await {
                Ok(signal) => signal,
                Err(e) => {
                    // The duplicate check fails open like any other signal
                    warn!(error = %e, "duplicate search unavailable");
                    HashSignal {
                        phash: fingerprint.to_base64(),
                        ..HashSignal::default()
                    }
                }
            }
        };

        let (ai, issue_match, mut exif, hash) =
            tokio::join!(ai_future, vision_future, exif_future, hash_future);

        // Address enrichment is cosmetic: best-effort, after the fan-out,
        // never a reason to fail or delay the verdict beyond its timeout.
        if let (Some(geocoder), Some(coordinates)) = (&self.geocoder, exif.coordinates) {
            exif.address = match timeout(self.adapter_timeout, geocoder.reverse(coordinates)).await
            {
                Ok(address) => address,
                Err(_) => {
                    debug!("reverse geocoding timed out");
                    None
                }
            };
        }

        let signals = crate::types::SignalSet {
            ai,
            exif,
            hash,
            issue_match,
        };
        let decision = decide(&signals, &self.policy);

        let validation_id = format!("VAL-{}", Uuid::new_v4().simple());
        let created_at = Utc::now();
        crate::db::validations::insert(&self.db, &validation_id, created_at, request, &decision)
            .await?;

        info!(
            validation_id = %validation_id,
            status = %decision.status,
            confidence = decision.confidence_score,
            "validation recorded"
        );

        Ok(ValidationOutcome {
            validation_id,
            created_at,
            decision,
        })
    }

    /// Register the fingerprint for a newly filed complaint. The record
    /// starts Pending and only becomes a duplicate reference once the
    /// complaint is resolved.
    pub async fn register_fingerprint(&self, issue_id: &str, image_path: &Path) -> Result<String> {
        let fingerprint = {
            let fingerprinter = Arc::clone(&self.fingerprinter);
            let path = image_path.to_path_buf();
            tokio::task::spawn_blocking(move || fingerprinter.fingerprint_file(&path))
                .await
                .map_err(|e| Error::Internal(format!("fingerprint task failed: {}", e)))??
        };

        self.hash_store
            .store(issue_id, &fingerprint, HashStatus::Pending)
            .await?;

        Ok(fingerprint.to_base64())
    }
}
