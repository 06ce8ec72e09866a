//! Time-versioned sale prices plus raw-material and overhead cost tables.
//!
//! Prices are append-only. A lookup "as of" an instant picks the newest
//! version whose validity start does not exceed that instant; among equal
//! starts the later insert wins.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use batchplant_core::{Money, PriceKind};

use crate::db::{fmt_ts, parse_ts, DbPool};
use crate::{decode_enum, StorageError};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PriceVersion {
    pub id: i64,
    pub kind: PriceKind,
    pub item_key: String,
    pub price: Money,
    pub currency: String,
    pub valid_from: DateTime<Utc>,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MaterialPrice {
    pub item_key: String,
    pub unit: String,
    pub price: Money,
    pub currency: String,
    pub valid_from: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct OverheadCost {
    pub name: String,
    pub cost_per_m3: Money,
    pub currency: String,
    pub valid_from: DateTime<Utc>,
}

#[allow(clippy::too_many_arguments)]
pub async fn set_price(
    pool: &DbPool,
    kind: PriceKind,
    item_key: &str,
    price: Money,
    currency: &str,
    valid_from: DateTime<Utc>,
    changed_by: Option<&str>,
    comment: &str,
) -> Result<i64, StorageError> {
    let res = sqlx::query(
        r#"
        INSERT INTO price_versions (kind, item_key, price_cents, currency, valid_from, changed_by, comment)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(kind.as_str())
    .bind(item_key)
    .bind(price.to_cents())
    .bind(currency)
    .bind(fmt_ts(valid_from))
    .bind(changed_by)
    .bind(comment)
    .execute(pool)
    .await?;
    Ok(res.last_insert_rowid())
}

/// Price of one item as it stood at `at`. None when no version was in
/// force yet.
pub async fn get_price(
    pool: &DbPool,
    kind: PriceKind,
    item_key: &str,
    at: DateTime<Utc>,
) -> Result<Option<PriceVersion>, StorageError> {
    let row: Option<(i64, String, String, i64, String, String, String)> = sqlx::query_as(
        r#"
        SELECT id, kind, item_key, price_cents, currency, valid_from, comment
        FROM price_versions
        WHERE kind = ? AND item_key = ? AND valid_from <= ?
        ORDER BY valid_from DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(kind.as_str())
    .bind(item_key)
    .bind(fmt_ts(at))
    .fetch_optional(pool)
    .await?;
    row.map(decode_version).transpose()
}

/// Latest version of every priced item, newest first within each kind.
pub async fn current_prices(pool: &DbPool) -> Result<Vec<PriceVersion>, StorageError> {
    let rows: Vec<(i64, String, String, i64, String, String, String)> = sqlx::query_as(
        r#"
        SELECT id, kind, item_key, price_cents, currency, valid_from, comment
        FROM price_versions
        ORDER BY valid_from DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    // Rows arrive newest first, so the first hit per (kind, item) is that
    // item's latest version.
    let mut seen: std::collections::HashSet<(String, String)> = std::collections::HashSet::new();
    let mut out = Vec::new();
    for row in rows {
        if seen.insert((row.1.clone(), row.2.clone())) {
            out.push(decode_version(row)?);
        }
    }
    out.sort_by(|a, b| a.kind.as_str().cmp(b.kind.as_str()).then(a.item_key.cmp(&b.item_key)));
    Ok(out)
}

fn decode_version(
    (id, kind, item_key, price_cents, currency, valid_from, comment): (
        i64,
        String,
        String,
        i64,
        String,
        String,
        String,
    ),
) -> Result<PriceVersion, StorageError> {
    Ok(PriceVersion {
        id,
        kind: decode_enum("kind", &kind)?,
        item_key,
        price: Money::from_cents(price_cents),
        currency,
        valid_from: parse_ts(&valid_from)?,
        comment,
    })
}

pub async fn add_material_price(
    pool: &DbPool,
    item_key: &str,
    unit: &str,
    price: Money,
    currency: &str,
    valid_from: DateTime<Utc>,
    changed_by: Option<&str>,
) -> Result<i64, StorageError> {
    let res = sqlx::query(
        r#"
        INSERT INTO material_prices (item_key, unit, price_cents, currency, valid_from, changed_by)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(item_key.trim().to_lowercase())
    .bind(unit)
    .bind(price.to_cents())
    .bind(currency)
    .bind(fmt_ts(valid_from))
    .bind(changed_by)
    .execute(pool)
    .await?;
    Ok(res.last_insert_rowid())
}

/// Latest price per material key. Keys are stored lowercased so recipe
/// component names match regardless of how the operator typed them.
pub async fn latest_material_prices(
    pool: &DbPool,
) -> Result<HashMap<String, MaterialPrice>, StorageError> {
    let rows: Vec<(String, String, i64, String, String)> = sqlx::query_as(
        r#"
        SELECT item_key, unit, price_cents, currency, valid_from
        FROM material_prices
        ORDER BY valid_from DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;
    let mut out = HashMap::new();
    for (item_key, unit, price_cents, currency, valid_from) in rows {
        out.entry(item_key.clone()).or_insert(MaterialPrice {
            item_key,
            unit,
            price: Money::from_cents(price_cents),
            currency,
            valid_from: parse_ts(&valid_from)?,
        });
    }
    Ok(out)
}

pub async fn add_overhead_cost(
    pool: &DbPool,
    name: &str,
    cost_per_m3: Money,
    currency: &str,
    valid_from: DateTime<Utc>,
    changed_by: Option<&str>,
) -> Result<i64, StorageError> {
    let res = sqlx::query(
        r#"
        INSERT INTO overhead_costs (name, cost_per_m3_cents, currency, valid_from, changed_by)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(name.trim().to_lowercase())
    .bind(cost_per_m3.to_cents())
    .bind(currency)
    .bind(fmt_ts(valid_from))
    .bind(changed_by)
    .execute(pool)
    .await?;
    Ok(res.last_insert_rowid())
}

pub async fn latest_overhead_costs(
    pool: &DbPool,
) -> Result<HashMap<String, OverheadCost>, StorageError> {
    let rows: Vec<(String, i64, String, String)> = sqlx::query_as(
        r#"
        SELECT name, cost_per_m3_cents, currency, valid_from
        FROM overhead_costs
        ORDER BY valid_from DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;
    let mut out = HashMap::new();
    for (name, cents, currency, valid_from) in rows {
        out.entry(name.clone()).or_insert(OverheadCost {
            name,
            cost_per_m3: Money::from_cents(cents),
            currency,
            valid_from: parse_ts(&valid_from)?,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_db_in_memory;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        chrono::NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
    }

    #[tokio::test]
    async fn price_as_of_picks_version_in_force() {
        let pool = create_db_in_memory().await.unwrap();
        set_price(&pool, PriceKind::Concrete, "М300", Money::from_cents(4500_00), "KGS", ts(2026, 3, 1), None, "")
            .await
            .unwrap();
        set_price(&pool, PriceKind::Concrete, "М300", Money::from_cents(4800_00), "KGS", ts(2026, 3, 15), None, "сезон")
            .await
            .unwrap();

        let before = get_price(&pool, PriceKind::Concrete, "М300", ts(2026, 3, 10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before.price, Money::from_cents(4500_00));

        let after = get_price(&pool, PriceKind::Concrete, "М300", ts(2026, 3, 20))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.price, Money::from_cents(4800_00));
        assert_eq!(after.comment, "сезон");

        assert!(get_price(&pool, PriceKind::Concrete, "М300", ts(2026, 2, 1))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn equal_valid_from_later_insert_wins() {
        let pool = create_db_in_memory().await.unwrap();
        let when = ts(2026, 3, 1);
        set_price(&pool, PriceKind::Blocks, "20x20x40", Money::from_cents(38_00), "KGS", when, None, "")
            .await
            .unwrap();
        set_price(&pool, PriceKind::Blocks, "20x20x40", Money::from_cents(40_00), "KGS", when, None, "")
            .await
            .unwrap();
        let got = get_price(&pool, PriceKind::Blocks, "20x20x40", when)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.price, Money::from_cents(40_00));
    }

    #[tokio::test]
    async fn current_prices_one_version_per_item() {
        let pool = create_db_in_memory().await.unwrap();
        set_price(&pool, PriceKind::Concrete, "М300", Money::from_cents(4500_00), "KGS", ts(2026, 1, 1), None, "")
            .await
            .unwrap();
        set_price(&pool, PriceKind::Concrete, "М300", Money::from_cents(4800_00), "KGS", ts(2026, 3, 1), None, "")
            .await
            .unwrap();
        set_price(&pool, PriceKind::Concrete, "М200", Money::from_cents(4100_00), "KGS", ts(2026, 2, 1), None, "")
            .await
            .unwrap();
        // Scheduled ahead of time; still the item's latest version.
        set_price(&pool, PriceKind::Concrete, "М400", Money::from_cents(5200_00), "KGS", ts(2126, 1, 1), None, "")
            .await
            .unwrap();

        let current = current_prices(&pool).await.unwrap();
        let keys: Vec<&str> = current.iter().map(|p| p.item_key.as_str()).collect();
        assert_eq!(keys, ["М200", "М300", "М400"]);
        assert_eq!(current[1].price, Money::from_cents(4800_00));
        assert_eq!(current[2].price, Money::from_cents(5200_00));
    }

    #[tokio::test]
    async fn material_prices_latest_and_normalized() {
        let pool = create_db_in_memory().await.unwrap();
        add_material_price(&pool, " Цемент ", "кг", Money::from_cents(8_50), "KGS", ts(2026, 1, 1), None)
            .await
            .unwrap();
        add_material_price(&pool, "цемент", "кг", Money::from_cents(9_00), "KGS", ts(2026, 2, 1), None)
            .await
            .unwrap();
        let latest = latest_material_prices(&pool).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest["цемент"].price, Money::from_cents(9_00));
    }

    #[tokio::test]
    async fn overhead_costs_latest_per_name() {
        let pool = create_db_in_memory().await.unwrap();
        add_overhead_cost(&pool, "электричество", Money::from_cents(120_00), "KGS", ts(2026, 1, 1), None)
            .await
            .unwrap();
        add_overhead_cost(&pool, "электричество", Money::from_cents(140_00), "KGS", ts(2026, 2, 1), None)
            .await
            .unwrap();
        add_overhead_cost(&pool, "зарплата", Money::from_cents(300_00), "KGS", ts(2026, 1, 1), None)
            .await
            .unwrap();
        let latest = latest_overhead_costs(&pool).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["электричество"].cost_per_m3, Money::from_cents(140_00));
    }
}
