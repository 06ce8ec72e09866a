use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::auth::require_auth;
use crate::state::AppState;

mod articles;
mod costs;
mod counterparties;
mod imports;
mod pnl;
mod prices;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/pnl", get(pnl::get_pnl))
        .route("/pnl.xlsx", get(pnl::get_pnl_xlsx))
        .route("/articles", get(articles::list_articles).post(articles::create_article))
        .route("/rules", get(articles::list_rules).post(articles::create_rule))
        .route("/transactions/{id}/article", post(articles::assign_article))
        .route("/imports/{id}", post(imports::upload).get(imports::get_job))
        .route("/imports", get(imports::list_jobs))
        .route("/prices", post(prices::set_price))
        .route("/prices/current", get(prices::current_prices))
        .route("/prices/{kind}/{item}", get(prices::price_at))
        .route("/materials/prices", post(prices::add_material_price))
        .route("/overheads", post(prices::add_overhead))
        .route("/recipes", get(costs::list_recipes).post(costs::upsert_recipe))
        .route("/costs/concrete", get(costs::concrete_costs))
        .route("/counterparties/latest", get(counterparties::latest_balances))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}
