//! Shared row models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a stored fingerprint.
///
/// Only `Resolved` records participate in duplicate search: a complaint
/// must have been verified and closed before its photo can disqualify a
/// later submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashStatus {
    Pending,
    Resolved,
    Rejected,
}

impl HashStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashStatus::Pending => "pending",
            HashStatus::Resolved => "resolved",
            HashStatus::Rejected => "rejected",
        }
    }

    /// Parse the database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(HashStatus::Pending),
            "resolved" => Some(HashStatus::Resolved),
            "rejected" => Some(HashStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for HashStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the fingerprint corpus.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HashRecord {
    pub issue_id: String,
    pub phash: String,
    pub status: String,
    pub created_at: String,
}
