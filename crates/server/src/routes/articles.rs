use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use batchplant_core::{PatternType, TxType};
use batchplant_storage::{audit, finance, Article, NewRule, RuleRecord};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateArticle {
    pub kind: TxType,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRule {
    pub kind: TxType,
    pub pattern_type: PatternType,
    pub pattern: String,
    #[serde(default = "default_priority")]
    pub priority: i64,
    pub article_id: i64,
    pub created_by: Option<String>,
}

fn default_priority() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct AssignArticle {
    pub tx_type: TxType,
    pub article_id: i64,
    pub changed_by: Option<String>,
}

pub async fn list_articles(
    State(state): State<AppState>,
) -> Result<Json<Vec<Article>>, ApiError> {
    Ok(Json(finance::list_articles(&state.db).await?))
}

pub async fn create_article(
    State(state): State<AppState>,
    Json(body): Json<CreateArticle>,
) -> Result<Json<Article>, ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("article name cannot be empty".to_string()));
    }
    if body.kind == TxType::Unknown {
        return Err(ApiError::BadRequest(
            "article kind must be income or expense".to_string(),
        ));
    }
    let id = finance::create_article(&state.db, body.kind, name).await?;
    let article = finance::get_article(&state.db, id).await?;
    Ok(Json(article))
}

pub async fn list_rules(
    State(state): State<AppState>,
) -> Result<Json<Vec<RuleRecord>>, ApiError> {
    Ok(Json(finance::list_rules(&state.db).await?))
}

pub async fn create_rule(
    State(state): State<AppState>,
    Json(body): Json<CreateRule>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.pattern.trim().is_empty() {
        return Err(ApiError::BadRequest("rule pattern cannot be empty".to_string()));
    }
    let id = finance::create_rule(
        &state.db,
        &NewRule {
            kind: body.kind,
            pattern_type: body.pattern_type,
            pattern: &body.pattern,
            priority: body.priority,
            article_id: body.article_id,
            created_by: body.created_by.as_deref(),
        },
    )
    .await?;
    audit::record(
        &state.db,
        body.created_by.as_deref(),
        "rule.create",
        "mapping_rule",
        &id.to_string(),
        &serde_json::json!({
            "kind": body.kind,
            "pattern_type": body.pattern_type,
            "pattern": body.pattern,
            "priority": body.priority,
            "article_id": body.article_id,
        }),
    )
    .await?;
    Ok(Json(serde_json::json!({ "id": id })))
}

pub async fn assign_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<AssignArticle>,
) -> Result<Json<serde_json::Value>, ApiError> {
    finance::assign_article(&state.db, id, body.tx_type, body.article_id).await?;
    audit::record(
        &state.db,
        body.changed_by.as_deref(),
        "transaction.assign_article",
        "finance_transaction",
        &id.to_string(),
        &serde_json::json!({ "tx_type": body.tx_type, "article_id": body.article_id }),
    )
    .await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
