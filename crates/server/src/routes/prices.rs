use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use batchplant_core::{Money, PriceKind};
use batchplant_storage::{audit, pricing, PriceVersion};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetPrice {
    pub kind: PriceKind,
    pub item_key: String,
    pub price: Decimal,
    pub currency: Option<String>,
    /// Defaults to now, so a plain price change takes effect immediately.
    pub valid_from: Option<DateTime<Utc>>,
    pub changed_by: Option<String>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct PriceAtQuery {
    pub at: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct AddMaterialPrice {
    pub item_key: String,
    #[serde(default)]
    pub unit: String,
    pub price: Decimal,
    pub currency: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub changed_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddOverhead {
    pub name: String,
    pub cost_per_m3: Decimal,
    pub currency: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub changed_by: Option<String>,
}

pub async fn set_price(
    State(state): State<AppState>,
    Json(body): Json<SetPrice>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let item_key = body.item_key.trim();
    if item_key.is_empty() {
        return Err(ApiError::BadRequest("item_key cannot be empty".to_string()));
    }
    let price = Money::from_decimal(body.price);
    if price.to_cents() < 0 {
        return Err(ApiError::BadRequest("price cannot be negative".to_string()));
    }
    let currency = body.currency.unwrap_or_else(|| state.config.default_currency.clone());
    let valid_from = body.valid_from.unwrap_or_else(Utc::now);

    let id = pricing::set_price(
        &state.db,
        body.kind,
        item_key,
        price,
        &currency,
        valid_from,
        body.changed_by.as_deref(),
        &body.comment,
    )
    .await?;
    audit::record(
        &state.db,
        body.changed_by.as_deref(),
        "price.set",
        "price_version",
        &id.to_string(),
        &serde_json::json!({
            "kind": body.kind,
            "item_key": item_key,
            "price": price,
            "valid_from": valid_from.to_rfc3339(),
        }),
    )
    .await?;
    Ok(Json(serde_json::json!({ "id": id })))
}

pub async fn current_prices(
    State(state): State<AppState>,
) -> Result<Json<Vec<PriceVersion>>, ApiError> {
    Ok(Json(pricing::current_prices(&state.db).await?))
}

/// Price of one item as of a given date, defaulting to today. The date is
/// taken as end-of-day so a price set that morning already applies.
pub async fn price_at(
    State(state): State<AppState>,
    Path((kind, item)): Path<(PriceKind, String)>,
    Query(query): Query<PriceAtQuery>,
) -> Result<Json<PriceVersion>, ApiError> {
    let at = match query.at {
        Some(d) => d
            .and_hms_opt(23, 59, 59)
            .map(|ndt| ndt.and_utc())
            .unwrap_or_else(Utc::now),
        None => Utc::now(),
    };
    let version = pricing::get_price(&state.db, kind, &item, at)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no price for {} '{item}'", kind.as_str())))?;
    Ok(Json(version))
}

pub async fn add_material_price(
    State(state): State<AppState>,
    Json(body): Json<AddMaterialPrice>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.item_key.trim().is_empty() {
        return Err(ApiError::BadRequest("item_key cannot be empty".to_string()));
    }
    let currency = body.currency.unwrap_or_else(|| state.config.default_currency.clone());
    let valid_from = body.valid_from.unwrap_or_else(Utc::now);
    let id = pricing::add_material_price(
        &state.db,
        &body.item_key,
        &body.unit,
        Money::from_decimal(body.price),
        &currency,
        valid_from,
        body.changed_by.as_deref(),
    )
    .await?;
    Ok(Json(serde_json::json!({ "id": id })))
}

pub async fn add_overhead(
    State(state): State<AppState>,
    Json(body): Json<AddOverhead>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name cannot be empty".to_string()));
    }
    let currency = body.currency.unwrap_or_else(|| state.config.default_currency.clone());
    let valid_from = body.valid_from.unwrap_or_else(Utc::now);
    let id = pricing::add_overhead_cost(
        &state.db,
        &body.name,
        Money::from_decimal(body.cost_per_m3),
        &currency,
        valid_from,
        body.changed_by.as_deref(),
    )
    .await?;
    Ok(Json(serde_json::json!({ "id": id })))
}
