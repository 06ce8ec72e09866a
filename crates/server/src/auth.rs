//! Shared-token auth for the protected routes. Accepts either
//! `Authorization: Bearer <token>` or `X-Api-Key: <token>`.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn require_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.config.auth_enabled {
        return Ok(next.run(req).await);
    }
    let Some(expected) = state.config.api_token.as_deref() else {
        return Err(ApiError::TokenUnconfigured);
    };

    let presented = bearer_token(&req).or_else(|| api_key(&req));
    match presented {
        Some(token) if tokens_match(token, expected) => Ok(next.run(req).await),
        _ => Err(ApiError::Unauthorized),
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn api_key(req: &Request) -> Option<&str> {
    req.headers().get("x-api-key")?.to_str().ok()
}

/// Compares SHA-256 digests instead of the raw strings so the comparison
/// time does not depend on how much of the token an attacker got right.
fn tokens_match(presented: &str, expected: &str) -> bool {
    Sha256::digest(presented.as_bytes()) == Sha256::digest(expected.as_bytes())
}
