//! Query helpers for the `image_hashes` table

use cpv_common::db::models::{HashRecord, HashStatus};
use cpv_common::Result;
use sqlx::SqlitePool;

/// Insert or replace the fingerprint for an issue.
///
/// The upsert is a single atomic statement, so a concurrent similarity
/// search never observes a partially written record.
pub async fn upsert(
    db: &SqlitePool,
    issue_id: &str,
    phash: &str,
    status: HashStatus,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO image_hashes (issue_id, phash, status, created_at, updated_at)
        VALUES (?, ?, ?, datetime('now'), datetime('now'))
        ON CONFLICT(issue_id) DO UPDATE SET
            phash = excluded.phash,
            status = excluded.status,
            updated_at = datetime('now')
        "#,
    )
    .bind(issue_id)
    .bind(phash)
    .bind(status.as_str())
    .execute(db)
    .await?;

    Ok(())
}

/// Update the lifecycle status. Returns false when no record exists for
/// the issue.
pub async fn set_status(db: &SqlitePool, issue_id: &str, status: HashStatus) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE image_hashes SET status = ?, updated_at = datetime('now') WHERE issue_id = ?",
    )
    .bind(status.as_str())
    .bind(issue_id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get(db: &SqlitePool, issue_id: &str) -> Result<Option<HashRecord>> {
    let record = sqlx::query_as::<_, HashRecord>(
        "SELECT issue_id, phash, status, created_at FROM image_hashes WHERE issue_id = ?",
    )
    .bind(issue_id)
    .fetch_optional(db)
    .await?;

    Ok(record)
}

/// All records in a given lifecycle state, newest first.
pub async fn list_by_status(db: &SqlitePool, status: HashStatus) -> Result<Vec<HashRecord>> {
    let records = sqlx::query_as::<_, HashRecord>(
        "SELECT issue_id, phash, status, created_at FROM image_hashes \
         WHERE status = ? ORDER BY created_at DESC",
    )
    .bind(status.as_str())
    .fetch_all(db)
    .await?;

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        cpv_common::db::init::create_image_hashes_table(&pool)
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn upsert_replaces_existing_record() {
        let pool = setup_test_db().await;

        upsert(&pool, "GG-1", "aaaa", HashStatus::Pending).await.unwrap();
        upsert(&pool, "GG-1", "bbbb", HashStatus::Resolved).await.unwrap();

        let record = get(&pool, "GG-1").await.unwrap().unwrap();
        assert_eq!(record.phash, "bbbb");
        assert_eq!(record.status, "resolved");

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM image_hashes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn list_by_status_filters() {
        let pool = setup_test_db().await;

        upsert(&pool, "GG-1", "aaaa", HashStatus::Pending).await.unwrap();
        upsert(&pool, "GG-2", "bbbb", HashStatus::Resolved).await.unwrap();
        upsert(&pool, "GG-3", "cccc", HashStatus::Resolved).await.unwrap();

        let resolved = list_by_status(&pool, HashStatus::Resolved).await.unwrap();
        assert_eq!(resolved.len(), 2);
        assert!(resolved.iter().all(|r| r.status == "resolved"));
    }

    #[tokio::test]
    async fn set_status_reports_missing_record() {
        let pool = setup_test_db().await;

        assert!(!set_status(&pool, "GG-404", HashStatus::Resolved).await.unwrap());

        upsert(&pool, "GG-1", "aaaa", HashStatus::Pending).await.unwrap();
        assert!(set_status(&pool, "GG-1", HashStatus::Resolved).await.unwrap());
    }
}
