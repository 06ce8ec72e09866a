//! Per-day aggregation queries backing the P&L report.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use batchplant_core::{DateRange, DaySum, Money, TxType};

use crate::db::{fmt_date, parse_date, DbPool};
use crate::StorageError;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ArticleTotal {
    pub article_id: i64,
    pub name: String,
    pub amount: Money,
}

/// Income, expense and unknown-row counts per calendar day over the range.
/// Rows without a date never enter the report. Days with no activity are
/// absent from the map; the aggregator zero-fills them.
pub async fn day_sums(
    pool: &DbPool,
    range: DateRange,
) -> Result<BTreeMap<NaiveDate, DaySum>, StorageError> {
    let rows: Vec<(String, i64, i64, i64)> = sqlx::query_as(
        r#"
        SELECT date,
               COALESCE(SUM(CASE WHEN tx_type = 'income' THEN amount_cents ELSE 0 END), 0),
               COALESCE(SUM(CASE WHEN tx_type = 'expense' THEN amount_cents ELSE 0 END), 0),
               COALESCE(SUM(CASE WHEN tx_type = 'unknown' THEN 1 ELSE 0 END), 0)
        FROM finance_transactions
        WHERE date IS NOT NULL AND date >= ? AND date <= ?
        GROUP BY date
        "#,
    )
    .bind(fmt_date(range.start))
    .bind(fmt_date(range.end))
    .fetch_all(pool)
    .await?;

    let mut out = BTreeMap::new();
    for (date, income_cents, expense_cents, unknown_rows) in rows {
        out.insert(
            parse_date(&date)?,
            DaySum {
                income: Money::from_cents(income_cents),
                expense: Money::from_cents(expense_cents),
                unknown_rows,
            },
        );
    }
    Ok(out)
}

/// Top articles of one side of the ledger by total amount over the range.
/// Asking for the unknown side yields nothing.
pub async fn top_articles(
    pool: &DbPool,
    tx_type: TxType,
    range: DateRange,
    limit: i64,
) -> Result<Vec<ArticleTotal>, StorageError> {
    let column = match tx_type {
        TxType::Income => "income_article_id",
        TxType::Expense => "expense_article_id",
        TxType::Unknown => return Ok(Vec::new()),
    };
    let sql = format!(
        r#"
        SELECT a.id, a.name, COALESCE(SUM(t.amount_cents), 0) AS total
        FROM finance_transactions t
        JOIN finance_articles a ON a.id = t.{column}
        WHERE t.tx_type = ? AND t.date IS NOT NULL AND t.date >= ? AND t.date <= ?
        GROUP BY a.id, a.name
        ORDER BY total DESC, a.name ASC
        LIMIT ?
        "#
    );
    let rows: Vec<(i64, String, i64)> = sqlx::query_as(&sql)
        .bind(tx_type.as_str())
        .bind(fmt_date(range.start))
        .bind(fmt_date(range.end))
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(article_id, name, cents)| ArticleTotal {
            article_id,
            name,
            amount: Money::from_cents(cents),
        })
        .collect())
}
