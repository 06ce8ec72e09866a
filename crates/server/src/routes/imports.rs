use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use batchplant_core::ImportKind;
use batchplant_storage::{jobs, ImportJob};

use crate::error::ApiError;
use crate::jobs as worker;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
    pub uploaded_by: Option<String>,
}

/// Accepts an xlsx upload, stores it and queues processing. Returns 202
/// with the job id; progress is polled via `GET /imports/{id}`.
pub async fn upload(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let kind: ImportKind = kind
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("unknown import kind '{kind}'")))?;
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty upload body".to_string()));
    }

    let filename = query
        .filename
        .unwrap_or_else(|| format!("{}.xlsx", kind.as_str()));
    let blob_key = format!("imports/{}.xlsx", Uuid::new_v4());
    state
        .blobs
        .put(&blob_key, &body)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("storing upload: {e}")))?;

    let job_id = jobs::create_job(
        &state.db,
        kind,
        &filename,
        &blob_key,
        query.uploaded_by.as_deref(),
    )
    .await?;
    tracing::info!(job_id, kind = kind.as_str(), %filename, "upload accepted");
    worker::spawn_import(state, job_id);

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "job_id": job_id, "status": "pending" })),
    ))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ImportJob>, ApiError> {
    Ok(Json(jobs::get_job(&state.db, id).await?))
}

pub async fn list_jobs(State(state): State<AppState>) -> Result<Json<Vec<ImportJob>>, ApiError> {
    Ok(Json(jobs::recent_jobs(&state.db, 50).await?))
}
