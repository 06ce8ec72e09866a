//! Append-only audit trail for manual edits: rule changes, article
//! assignments, price updates.

use chrono::{DateTime, Utc};

use crate::db::{parse_ts, DbPool};
use crate::StorageError;

#[derive(Debug, Clone, serde::Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub actor: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub async fn record(
    pool: &DbPool,
    actor: Option<&str>,
    action: &str,
    entity_type: &str,
    entity_id: &str,
    payload: &serde_json::Value,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO audit_log (actor, action, entity_type, entity_id, payload) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(actor)
    .bind(action)
    .bind(entity_type)
    .bind(entity_id)
    .bind(payload.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn recent(pool: &DbPool, limit: i64) -> Result<Vec<AuditEntry>, StorageError> {
    let rows: Vec<(i64, Option<String>, String, String, String, String, String)> = sqlx::query_as(
        r#"
        SELECT id, actor, action, entity_type, entity_id, payload, created_at
        FROM audit_log ORDER BY id DESC LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|(id, actor, action, entity_type, entity_id, payload, created_at)| {
            Ok(AuditEntry {
                id,
                actor,
                action,
                entity_type,
                entity_id,
                payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
                created_at: parse_ts(&created_at)?,
            })
        })
        .collect()
}
