use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use batchplant_core::{recipe_cost, ConcreteRecipe, Money, RecipeCost};
use batchplant_storage::{pricing, recipes};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpsertRecipe {
    pub mark: String,
    #[serde(default)]
    pub cement_kg: f64,
    #[serde(default)]
    pub sand_t: f64,
    #[serde(default)]
    pub crushed_stone_t: f64,
    #[serde(default)]
    pub screening_t: f64,
    #[serde(default)]
    pub water_l: f64,
    #[serde(default)]
    pub additives_l: f64,
}

#[derive(Serialize)]
pub struct RecipeCostOut {
    pub mark: String,
    pub total: Money,
    pub complete: bool,
    pub missing_materials: Vec<String>,
}

impl From<RecipeCost> for RecipeCostOut {
    fn from(c: RecipeCost) -> Self {
        RecipeCostOut {
            complete: c.is_complete(),
            mark: c.mark,
            total: c.total,
            missing_materials: c.missing,
        }
    }
}

pub async fn list_recipes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ConcreteRecipe>>, ApiError> {
    Ok(Json(recipes::active_recipes(&state.db).await?))
}

pub async fn upsert_recipe(
    State(state): State<AppState>,
    Json(body): Json<UpsertRecipe>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mark = body.mark.trim();
    if mark.is_empty() {
        return Err(ApiError::BadRequest("recipe mark cannot be empty".to_string()));
    }
    let recipe = ConcreteRecipe {
        mark: mark.to_string(),
        cement_kg: body.cement_kg,
        sand_t: body.sand_t,
        crushed_stone_t: body.crushed_stone_t,
        screening_t: body.screening_t,
        water_l: body.water_l,
        additives_l: body.additives_l,
    };
    recipes::upsert_recipe(&state.db, &recipe).await?;
    Ok(Json(serde_json::json!({ "mark": recipe.mark })))
}

/// Cost per cubic meter for every active mix, from the latest material
/// prices plus all current overheads. Marks with missing material prices
/// come back flagged rather than omitted.
pub async fn concrete_costs(
    State(state): State<AppState>,
) -> Result<Json<Vec<RecipeCostOut>>, ApiError> {
    let recipes = recipes::active_recipes(&state.db).await?;
    let material_prices: std::collections::HashMap<String, Money> =
        pricing::latest_material_prices(&state.db)
            .await?
            .into_iter()
            .map(|(key, p)| (key, p.price))
            .collect();
    let overheads: Vec<Money> = pricing::latest_overhead_costs(&state.db)
        .await?
        .into_values()
        .map(|o| o.cost_per_m3)
        .collect();

    let costs = recipes
        .iter()
        .map(|r| recipe_cost(r, &material_prices, &overheads).into())
        .collect();
    Ok(Json(costs))
}
