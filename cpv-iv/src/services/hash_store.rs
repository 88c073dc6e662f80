//! Fingerprint corpus store and near-duplicate matcher
//!
//! One fingerprint per issue (upsert semantics). Only fingerprints of
//! resolved complaints are eligible duplicate references, so two reporters
//! photographing the same still-open issue are never flagged against each
//! other.

use crate::services::fingerprinter::Fingerprint;
use crate::types::HashSignal;
use cpv_common::db::models::HashStatus;
use cpv_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

/// A near-duplicate match. `find_similar` returns these ascending by
/// distance, closest first.
#[derive(Debug, Clone, PartialEq)]
pub struct HashMatch {
    pub issue_id: String,
    pub distance: u32,
    pub similarity_score: f64,
}

/// Fingerprint corpus backed by the shared SQLite database.
pub struct HashStore {
    db: SqlitePool,
    threshold: u32,
}

impl HashStore {
    pub fn new(db: SqlitePool, threshold: u32) -> Self {
        Self { db, threshold }
    }

    /// Store a fingerprint for an issue. Re-submitting for the same
    /// issue_id replaces the stored record (atomic upsert), never
    /// duplicating it.
    pub async fn store(
        &self,
        issue_id: &str,
        fingerprint: &Fingerprint,
        status: HashStatus,
    ) -> Result<()> {
        crate::db::hashes::upsert(&self.db, issue_id, &fingerprint.to_base64(), status).await?;
        info!(issue_id, status = %status, "stored fingerprint");
        Ok(())
    }

    /// Transition the lifecycle status of a stored fingerprint.
    ///
    /// `Resolved` is the transition that makes a record eligible as a
    /// duplicate reference.
    pub async fn set_status(&self, issue_id: &str, status: HashStatus) -> Result<()> {
        let updated = crate::db::hashes::set_status(&self.db, issue_id, status).await?;
        if !updated {
            return Err(Error::NotFound(format!(
                "no fingerprint stored for issue {}",
                issue_id
            )));
        }
        info!(issue_id, status = %status, "updated fingerprint status");
        Ok(())
    }

    /// Find stored fingerprints within the Hamming-distance threshold of
    /// the query, closest first. Scans resolved records only.
    ///
    /// Corrupt fingerprint records are logged and treated as unmatched.
    pub async fn find_similar(&self, fingerprint: &Fingerprint) -> Result<Vec<HashMatch>> {
        let rows = crate::db::hashes::list_by_status(&self.db, HashStatus::Resolved).await?;

        let mut matches = Vec::new();
        for row in rows {
            let Some(stored) = Fingerprint::from_base64(&row.phash) else {
                warn!(issue_id = %row.issue_id, "corrupt fingerprint record, skipping");
                continue;
            };
            let distance = fingerprint.distance(&stored);
            if distance <= self.threshold {
                matches.push(HashMatch {
                    issue_id: row.issue_id,
                    distance,
                    similarity_score: similarity_score(distance, self.threshold),
                });
            }
        }

        matches.sort_by_key(|m| m.distance);
        Ok(matches)
    }

    /// Run a duplicate search and fold the result into a `HashSignal`.
    pub async fn check(&self, fingerprint: &Fingerprint) -> Result<HashSignal> {
        let matches = self.find_similar(fingerprint).await?;

        match matches.first() {
            Some(best) => {
                warn!(
                    original_issue_id = %best.issue_id,
                    distance = best.distance,
                    similarity = best.similarity_score,
                    "submitted image duplicates a resolved complaint"
                );
                Ok(HashSignal {
                    phash: fingerprint.to_base64(),
                    is_duplicate: true,
                    similarity_score: best.similarity_score,
                    original_issue_id: Some(best.issue_id.clone()),
                    distance: best.distance,
                })
            }
            None => {
                debug!("no similar fingerprints in corpus");
                Ok(HashSignal {
                    phash: fingerprint.to_base64(),
                    ..HashSignal::default()
                })
            }
        }
    }
}

/// `(threshold - distance) / threshold`: 1.0 at distance 0, 0.0 at the
/// threshold, strictly decreasing in between. Only defined for
/// `distance <= threshold`.
pub fn similarity_score(distance: u32, threshold: u32) -> f64 {
    debug_assert!(distance <= threshold);
    if threshold == 0 {
        return if distance == 0 { 1.0 } else { 0.0 };
    }
    (threshold - distance) as f64 / threshold as f64
}
