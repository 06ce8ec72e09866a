use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use serde::Serialize;

use batchplant_storage::counterparty::{self, BalanceRecord};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct LatestBalances {
    pub snapshot_date: NaiveDate,
    pub balances: Vec<BalanceRecord>,
}

pub async fn latest_balances(
    State(state): State<AppState>,
) -> Result<Json<LatestBalances>, ApiError> {
    let (snapshot_id, snapshot_date) = counterparty::latest_snapshot(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("no counterparty snapshot imported yet".to_string()))?;
    let balances = counterparty::balances_for_snapshot(&state.db, snapshot_id).await?;
    Ok(Json(LatestBalances { snapshot_date, balances }))
}
