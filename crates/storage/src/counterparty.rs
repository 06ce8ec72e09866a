//! Counterparty debt snapshots. Every upload becomes a new snapshot; the
//! balances of older snapshots stay untouched for history.

use chrono::NaiveDate;
use sqlx::SqliteConnection;

use batchplant_core::Money;
use batchplant_import::CounterpartyRow;

use crate::db::{fmt_date, parse_date, DbPool};
use crate::StorageError;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BalanceRecord {
    pub counterparty_name: String,
    pub counterparty_name_norm: String,
    pub receivable_money: Money,
    pub receivable_assets: String,
    pub payable_money: Money,
    pub payable_assets: String,
    pub ending_balance_money: Money,
}

pub async fn create_snapshot(
    conn: &mut SqliteConnection,
    snapshot_date: NaiveDate,
    import_job_id: i64,
) -> Result<i64, StorageError> {
    let res = sqlx::query(
        "INSERT INTO counterparty_snapshots (snapshot_date, import_job_id) VALUES (?, ?)",
    )
    .bind(fmt_date(snapshot_date))
    .bind(import_job_id)
    .execute(conn)
    .await?;
    Ok(res.last_insert_rowid())
}

pub async fn insert_balance(
    conn: &mut SqliteConnection,
    snapshot_id: i64,
    row: &CounterpartyRow,
) -> Result<i64, StorageError> {
    let res = sqlx::query(
        r#"
        INSERT INTO counterparty_balances
            (snapshot_id, counterparty_name, counterparty_name_norm,
             receivable_money_cents, receivable_assets,
             payable_money_cents, payable_assets, ending_balance_money_cents)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(snapshot_id)
    .bind(&row.counterparty_name)
    .bind(&row.counterparty_name_norm)
    .bind(row.receivable_money.to_cents())
    .bind(&row.receivable_assets)
    .bind(row.payable_money.to_cents())
    .bind(&row.payable_assets)
    .bind(row.ending_balance_money.to_cents())
    .execute(conn)
    .await?;
    Ok(res.last_insert_rowid())
}

/// Newest snapshot id and date, if any upload has been processed.
pub async fn latest_snapshot(pool: &DbPool) -> Result<Option<(i64, NaiveDate)>, StorageError> {
    let row: Option<(i64, String)> = sqlx::query_as(
        "SELECT id, snapshot_date FROM counterparty_snapshots ORDER BY snapshot_date DESC, id DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    row.map(|(id, date)| Ok((id, parse_date(&date)?))).transpose()
}

pub async fn balances_for_snapshot(
    pool: &DbPool,
    snapshot_id: i64,
) -> Result<Vec<BalanceRecord>, StorageError> {
    let rows: Vec<(String, String, i64, String, i64, String, i64)> = sqlx::query_as(
        r#"
        SELECT counterparty_name, counterparty_name_norm,
               receivable_money_cents, receivable_assets,
               payable_money_cents, payable_assets, ending_balance_money_cents
        FROM counterparty_balances
        WHERE snapshot_id = ?
        ORDER BY counterparty_name_norm
        "#,
    )
    .bind(snapshot_id)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(
            |(name, norm, recv_cents, recv_assets, pay_cents, pay_assets, end_cents)| {
                BalanceRecord {
                    counterparty_name: name,
                    counterparty_name_norm: norm,
                    receivable_money: Money::from_cents(recv_cents),
                    receivable_assets: recv_assets,
                    payable_money: Money::from_cents(pay_cents),
                    payable_assets: pay_assets,
                    ending_balance_money: Money::from_cents(end_cents),
                }
            },
        )
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_db_in_memory;
    use crate::jobs;
    use batchplant_core::ImportKind;

    fn row(name: &str, recv: i64, pay: i64) -> CounterpartyRow {
        CounterpartyRow {
            counterparty_name: name.to_string(),
            counterparty_name_norm: name.trim().to_lowercase(),
            receivable_money: Money::from_cents(recv),
            receivable_assets: String::new(),
            payable_money: Money::from_cents(pay),
            payable_assets: String::new(),
            ending_balance_money: Money::from_cents(recv - pay),
            raw_fields: Default::default(),
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn snapshots_accumulate_and_latest_wins() {
        let pool = create_db_in_memory().await.unwrap();
        let job = jobs::create_job(&pool, ImportKind::Counterparty, "cp.xlsx", "k", None)
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let old = create_snapshot(&mut conn, d(2026, 2, 1), job).await.unwrap();
        insert_balance(&mut conn, old, &row("ОсОО Ремикс", 500_00, 0)).await.unwrap();

        let new = create_snapshot(&mut conn, d(2026, 3, 1), job).await.unwrap();
        insert_balance(&mut conn, new, &row("ОсОО Ремикс", 300_00, 0)).await.unwrap();
        insert_balance(&mut conn, new, &row("ИП Асанов", 0, 120_00)).await.unwrap();
        drop(conn);

        let (latest_id, latest_date) = latest_snapshot(&pool).await.unwrap().unwrap();
        assert_eq!(latest_id, new);
        assert_eq!(latest_date, d(2026, 3, 1));

        let balances = balances_for_snapshot(&pool, latest_id).await.unwrap();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[1].counterparty_name, "ОсОО Ремикс");
        assert_eq!(balances[1].receivable_money, Money::from_cents(300_00));

        // History is intact.
        let old_balances = balances_for_snapshot(&pool, old).await.unwrap();
        assert_eq!(old_balances[0].receivable_money, Money::from_cents(500_00));
    }

    #[tokio::test]
    async fn no_snapshot_yet() {
        let pool = create_db_in_memory().await.unwrap();
        assert!(latest_snapshot(&pool).await.unwrap().is_none());
    }
}
