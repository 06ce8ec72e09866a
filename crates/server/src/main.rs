use std::sync::Arc;

use anyhow::Context;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod auth;
mod blob;
mod config;
mod error;
mod jobs;
mod routes;
mod state;
mod xlsx;

use blob::FsBlobStore;
use config::Config;
use state::AppState;

/// Uploaded statements stay well under this; anything larger is junk.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load()?;

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::create_dir_all(&config.blob_dir)
        .with_context(|| format!("creating {}", config.blob_dir.display()))?;

    let db = batchplant_storage::create_db(&config.db_path)
        .await
        .with_context(|| format!("opening database {}", config.db_path.display()))?;

    if config.auth_enabled && config.api_token.is_none() {
        tracing::warn!("auth is enabled but no API token is configured; protected routes will answer 503");
    }

    let state = AppState {
        db,
        blobs: FsBlobStore::new(&config.blob_dir),
        config: Arc::new(config.clone()),
    };

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!("listening on {}", config.listen_addr);
    axum::serve(listener, app).await.context("server exited")?;
    Ok(())
}
