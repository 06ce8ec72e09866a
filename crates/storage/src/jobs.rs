//! Import job records. A job is created when a file lands, then walked
//! through pending -> processing -> done/failed by the background worker.

use chrono::{DateTime, Utc};

use batchplant_core::{ImportKind, JobStatus};

use crate::db::{parse_ts, DbPool};
use crate::{decode_enum, StorageError};

#[derive(Debug, Clone, serde::Serialize)]
pub struct ImportJob {
    pub id: i64,
    pub kind: ImportKind,
    pub status: JobStatus,
    pub filename: String,
    pub blob_key: String,
    pub summary: serde_json::Value,
    pub error: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

pub async fn create_job(
    pool: &DbPool,
    kind: ImportKind,
    filename: &str,
    blob_key: &str,
    created_by: Option<&str>,
) -> Result<i64, StorageError> {
    let res = sqlx::query(
        "INSERT INTO import_jobs (kind, filename, blob_key, created_by) VALUES (?, ?, ?, ?)",
    )
    .bind(kind.as_str())
    .bind(filename)
    .bind(blob_key)
    .bind(created_by)
    .execute(pool)
    .await?;
    Ok(res.last_insert_rowid())
}

pub async fn get_job(pool: &DbPool, id: i64) -> Result<ImportJob, StorageError> {
    let row: Option<JobRow> = sqlx::query_as(
        r#"
        SELECT id, kind, status, filename, blob_key, summary, error,
               created_by, created_at, processed_at
        FROM import_jobs WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.ok_or(StorageError::JobNotFound(id))?.decode()
}

pub async fn recent_jobs(pool: &DbPool, limit: i64) -> Result<Vec<ImportJob>, StorageError> {
    let rows: Vec<JobRow> = sqlx::query_as(
        r#"
        SELECT id, kind, status, filename, blob_key, summary, error,
               created_by, created_at, processed_at
        FROM import_jobs ORDER BY id DESC LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(JobRow::decode).collect()
}

pub async fn mark_processing(pool: &DbPool, id: i64) -> Result<(), StorageError> {
    sqlx::query("UPDATE import_jobs SET status = 'processing' WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_done(
    pool: &DbPool,
    id: i64,
    summary: &serde_json::Value,
) -> Result<(), StorageError> {
    sqlx::query(
        "UPDATE import_jobs SET status = 'done', summary = ?, processed_at = datetime('now') WHERE id = ?",
    )
    .bind(summary.to_string())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_failed(pool: &DbPool, id: i64, error: &str) -> Result<(), StorageError> {
    sqlx::query(
        "UPDATE import_jobs SET status = 'failed', error = ?, processed_at = datetime('now') WHERE id = ?",
    )
    .bind(error)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

type JobRow = (
    i64,
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    Option<String>,
);

trait DecodeJob {
    fn decode(self) -> Result<ImportJob, StorageError>;
}

impl DecodeJob for JobRow {
    fn decode(self) -> Result<ImportJob, StorageError> {
        let (id, kind, status, filename, blob_key, summary, error, created_by, created_at, processed_at) =
            self;
        Ok(ImportJob {
            id,
            kind: decode_enum("kind", &kind)?,
            status: decode_enum("status", &status)?,
            filename,
            blob_key,
            summary: serde_json::from_str(&summary).unwrap_or(serde_json::Value::Null),
            error,
            created_by,
            created_at: parse_ts(&created_at)?,
            processed_at: processed_at.as_deref().map(parse_ts).transpose()?,
        })
    }
}
