use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use batchplant_core::{aggregate, DailyPoint, DateRange, PnlRow, ReportPeriod, TxType};
use batchplant_storage::pnl::{self as pnl_store, ArticleTotal};

use crate::error::ApiError;
use crate::state::AppState;
use crate::xlsx;

const TOP_ARTICLES_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct PnlQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub period: Option<String>,
}

#[derive(Serialize)]
pub struct PnlResponse {
    pub period: ReportPeriod,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub rows: Vec<PnlRowOut>,
    pub daily: Vec<DailyPoint>,
    pub total_income: batchplant_core::Money,
    pub total_expense: batchplant_core::Money,
    pub total_net: batchplant_core::Money,
    pub unknown_rows: i64,
    pub top_income: Vec<ArticleTotal>,
    pub top_expense: Vec<ArticleTotal>,
}

#[derive(Serialize)]
pub struct PnlRowOut {
    pub period_start: NaiveDate,
    pub income: batchplant_core::Money,
    pub expense: batchplant_core::Money,
    pub net: batchplant_core::Money,
}

impl From<PnlRow> for PnlRowOut {
    fn from(r: PnlRow) -> Self {
        PnlRowOut {
            period_start: r.period_start,
            income: r.income_sum,
            expense: r.expense_sum,
            net: r.net_profit(),
        }
    }
}

struct Report {
    table: batchplant_core::PnlTable,
    top_income: Vec<ArticleTotal>,
    top_expense: Vec<ArticleTotal>,
}

async fn build_report(state: &AppState, query: &PnlQuery) -> Result<Report, ApiError> {
    let period = match query.period.as_deref() {
        None => ReportPeriod::Month,
        Some(s) => s
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("unknown period '{s}'")))?,
    };
    let range = DateRange::new(query.start, query.end);
    if range.start > range.end {
        return Err(ApiError::Unprocessable(format!(
            "invalid date range: start {} is after end {}",
            range.start, range.end
        )));
    }

    let by_day = pnl_store::day_sums(&state.db, range).await?;
    let table = aggregate(range, period, &by_day)?;
    let top_income =
        pnl_store::top_articles(&state.db, TxType::Income, range, TOP_ARTICLES_LIMIT).await?;
    let top_expense =
        pnl_store::top_articles(&state.db, TxType::Expense, range, TOP_ARTICLES_LIMIT).await?;
    Ok(Report { table, top_income, top_expense })
}

pub async fn get_pnl(
    State(state): State<AppState>,
    Query(query): Query<PnlQuery>,
) -> Result<Json<PnlResponse>, ApiError> {
    let report = build_report(&state, &query).await?;
    let table = report.table;
    Ok(Json(PnlResponse {
        period: table.period,
        start: table.range.start,
        end: table.range.end,
        total_net: table.total_net(),
        rows: table.rows.into_iter().map(Into::into).collect(),
        daily: table.daily,
        total_income: table.total_income,
        total_expense: table.total_expense,
        unknown_rows: table.unknown_rows,
        top_income: report.top_income,
        top_expense: report.top_expense,
    }))
}

pub async fn get_pnl_xlsx(
    State(state): State<AppState>,
    Query(query): Query<PnlQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let report = build_report(&state, &query).await?;
    let bytes = xlsx::pnl_workbook(&report.table, &report.top_income, &report.top_expense)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("workbook build failed: {e}")))?;

    let filename = format!("pnl_{}_{}.xlsx", query.start, query.end);
    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    ))
}
