//! Database initialization
//!
//! Opens (or creates) the shared SQLite database and applies the schema
//! idempotently. Safe to call on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection pool and create tables if needed.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer; validations read the
    // hash corpus while complaint registrations write to it.
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    // Migrations (idempotent - safe to call multiple times)
    create_image_hashes_table(&pool).await?;
    create_image_validations_table(&pool).await?;

    Ok(pool)
}

/// Fingerprint corpus: one perceptual hash per issue.
///
/// `status` follows the complaint lifecycle (pending/resolved/rejected);
/// only resolved records are eligible duplicate references.
pub async fn create_image_hashes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS image_hashes (
            issue_id TEXT PRIMARY KEY,
            phash TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_image_hashes_status ON image_hashes(status)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Validation audit records: append-only, one row per validation run,
/// carrying every input signal verbatim for later inspection.
pub async fn create_image_validations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS image_validations (
            validation_id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            image_path TEXT NOT NULL,
            issue_id TEXT,
            issue_type TEXT NOT NULL,
            status TEXT NOT NULL,
            reason_codes TEXT NOT NULL,
            confidence_score REAL NOT NULL,
            message TEXT NOT NULL,
            ai_signal TEXT NOT NULL,
            exif_signal TEXT NOT NULL,
            hash_signal TEXT NOT NULL,
            issue_match_signal TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_image_validations_issue ON image_validations(issue_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_image_validations_status ON image_validations(status)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_image_validations_created ON image_validations(created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("cpv.db");

        let pool = init_database(&db_path).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert!(names.contains(&"image_hashes"));
        assert!(names.contains(&"image_validations"));
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("cpv.db");

        let pool = init_database(&db_path).await.unwrap();
        drop(pool);
        // Second open must not fail on existing schema
        init_database(&db_path).await.unwrap();
    }
}
