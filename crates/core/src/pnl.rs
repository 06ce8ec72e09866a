//! Profit-and-loss bucketing. Takes per-day sums already fetched from
//! storage and re-buckets them in memory by the requested period floor.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::money::Money;
use crate::period::{DateRange, ReportPeriod};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PnlError {
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// Sums for one calendar day, as grouped by the storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySum {
    pub income: Money,
    pub expense: Money,
    pub unknown_rows: i64,
}

impl Default for DaySum {
    fn default() -> Self {
        DaySum {
            income: Money::zero(),
            expense: Money::zero(),
            unknown_rows: 0,
        }
    }
}

/// One period bucket of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnlRow {
    pub period_start: NaiveDate,
    pub income_sum: Money,
    pub expense_sum: Money,
}

impl PnlRow {
    pub fn net_profit(&self) -> Money {
        self.income_sum - self.expense_sum
    }
}

/// Per-day point for chart rendering, produced regardless of the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub income: Money,
    pub expense: Money,
    pub net: Money,
}

/// The bucketed report body. Top-article rankings are joined in by the
/// caller since they come from a separate storage query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PnlTable {
    pub period: ReportPeriod,
    pub range: DateRange,
    pub rows: Vec<PnlRow>,
    pub daily: Vec<DailyPoint>,
    pub total_income: Money,
    pub total_expense: Money,
    pub unknown_rows: i64,
}

impl PnlTable {
    pub fn total_net(&self) -> Money {
        self.total_income - self.total_expense
    }
}

/// Buckets per-day sums into period rows over the inclusive range.
///
/// Every period touched by the range appears in the output even when no
/// transaction fell into it; days absent from `by_day` contribute zeros.
pub fn aggregate(
    range: DateRange,
    period: ReportPeriod,
    by_day: &BTreeMap<NaiveDate, DaySum>,
) -> Result<PnlTable, PnlError> {
    if range.start > range.end {
        return Err(PnlError::InvalidRange {
            start: range.start,
            end: range.end,
        });
    }

    let mut buckets: BTreeMap<NaiveDate, PnlRow> = BTreeMap::new();
    let mut daily = Vec::new();
    let mut unknown_rows = 0;

    for day in range.days() {
        let sum = by_day.get(&day).copied().unwrap_or_default();
        unknown_rows += sum.unknown_rows;

        let period_start = period.floor(day);
        let bucket = buckets.entry(period_start).or_insert_with(|| PnlRow {
            period_start,
            income_sum: Money::zero(),
            expense_sum: Money::zero(),
        });
        bucket.income_sum += sum.income;
        bucket.expense_sum += sum.expense;

        daily.push(DailyPoint {
            date: day,
            income: sum.income,
            expense: sum.expense,
            net: sum.income - sum.expense,
        });
    }

    let rows: Vec<PnlRow> = buckets.into_values().collect();
    let total_income = rows.iter().map(|r| r.income_sum).sum();
    let total_expense = rows.iter().map(|r| r.expense_sum).sum();

    Ok(PnlTable {
        period,
        range,
        rows,
        daily,
        total_income,
        total_expense,
        unknown_rows,
    })
}
