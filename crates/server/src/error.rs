use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use batchplant_core::PnlError;
use batchplant_import::ImportError;
use batchplant_storage::StorageError;

/// API-facing error. Every variant maps to one status code and a JSON body
/// of the shape `{"detail": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("missing or invalid API token")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("API token is not configured")]
    TokenUnconfigured,
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::TokenUnconfigured => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(e) = &self {
            tracing::error!("internal error: {e:#}");
        }
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (self.status(), body).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::ArticleNotFound(id) => {
                ApiError::NotFound(format!("article {id} not found"))
            }
            StorageError::TransactionNotFound(id) => {
                ApiError::NotFound(format!("transaction {id} not found"))
            }
            StorageError::JobNotFound(id) => {
                ApiError::NotFound(format!("import job {id} not found"))
            }
            StorageError::ArticleExists(name) => {
                ApiError::Conflict(format!("article '{name}' already exists"))
            }
            StorageError::DuplicateRow { job_id } => {
                ApiError::Conflict(format!("duplicate row in import job {job_id}"))
            }
            StorageError::Classify(e) => ApiError::Unprocessable(e.to_string()),
            e => ApiError::Internal(e.into()),
        }
    }
}

impl From<PnlError> for ApiError {
    fn from(e: PnlError) -> Self {
        match e {
            PnlError::InvalidRange { .. } => ApiError::Unprocessable(e.to_string()),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(e: ImportError) -> Self {
        ApiError::Unprocessable(e.to_string())
    }
}
