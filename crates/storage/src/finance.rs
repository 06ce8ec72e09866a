//! Finance articles, mapping rules and imported transactions.

use chrono::NaiveDate;
use sqlx::SqliteConnection;
use std::collections::HashMap;

use batchplant_core::{Money, PatternType, TxType};
use batchplant_import::{apply_article, FinanceRow, MappingRule};

use crate::db::{fmt_date, parse_date, DbPool};
use crate::{decode_enum, StorageError};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Article {
    pub id: i64,
    pub kind: TxType,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RuleRecord {
    pub id: i64,
    pub kind: TxType,
    pub pattern_type: PatternType,
    pub pattern: String,
    pub priority: i64,
    pub is_active: bool,
    pub article_id: i64,
    pub article_name: String,
}

#[derive(Debug)]
pub struct NewRule<'a> {
    pub kind: TxType,
    pub pattern_type: PatternType,
    pub pattern: &'a str,
    pub priority: i64,
    pub article_id: i64,
    pub created_by: Option<&'a str>,
}

#[derive(Debug)]
pub struct NewTransaction<'a> {
    pub import_job_id: i64,
    pub row: &'a FinanceRow,
    pub tx_type: TxType,
    pub income_article_id: Option<i64>,
    pub expense_article_id: Option<i64>,
    pub dedup_hash: &'a str,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub import_job_id: i64,
    pub date: Option<NaiveDate>,
    pub amount: Money,
    pub currency: String,
    pub tx_type: TxType,
    pub description: String,
    pub counterparty: String,
    pub income_article_id: Option<i64>,
    pub expense_article_id: Option<i64>,
}

pub async fn create_article(
    pool: &DbPool,
    kind: TxType,
    name: &str,
) -> Result<i64, StorageError> {
    let res = sqlx::query("INSERT INTO finance_articles (kind, name) VALUES (?, ?)")
        .bind(kind.as_str())
        .bind(name)
        .execute(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(d) if d.is_unique_violation() => {
                StorageError::ArticleExists(name.to_string())
            }
            _ => StorageError::Db(e),
        })?;
    Ok(res.last_insert_rowid())
}

pub async fn get_article(pool: &DbPool, id: i64) -> Result<Article, StorageError> {
    let row: Option<(i64, String, String, i64)> =
        sqlx::query_as("SELECT id, kind, name, is_active FROM finance_articles WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    let (id, kind, name, is_active) = row.ok_or(StorageError::ArticleNotFound(id))?;
    Ok(Article {
        id,
        kind: decode_enum("kind", &kind)?,
        name,
        is_active: is_active != 0,
    })
}

pub async fn list_articles(pool: &DbPool) -> Result<Vec<Article>, StorageError> {
    let rows: Vec<(i64, String, String, i64)> = sqlx::query_as(
        "SELECT id, kind, name, is_active FROM finance_articles ORDER BY kind, name",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|(id, kind, name, is_active)| {
            Ok(Article {
                id,
                kind: decode_enum("kind", &kind)?,
                name,
                is_active: is_active != 0,
            })
        })
        .collect()
}

/// Article id to kind, for resolving classifier hits during an import run.
pub async fn article_kinds(pool: &DbPool) -> Result<HashMap<i64, TxType>, StorageError> {
    let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, kind FROM finance_articles")
        .fetch_all(pool)
        .await?;
    let mut out = HashMap::with_capacity(rows.len());
    for (id, kind) in rows {
        out.insert(id, decode_enum("kind", &kind)?);
    }
    Ok(out)
}

/// Creates a mapping rule. The target article must exist and carry the same
/// kind as the rule; the check runs here rather than at classification time
/// so a bad rule never enters the table.
pub async fn create_rule(pool: &DbPool, rule: &NewRule<'_>) -> Result<i64, StorageError> {
    let article = get_article(pool, rule.article_id).await?;
    if article.kind != rule.kind {
        return Err(batchplant_import::ClassifyError::KindMismatch {
            tx_type: rule.kind,
            article_kind: article.kind,
        }
        .into());
    }
    let res = sqlx::query(
        r#"
        INSERT INTO mapping_rules (kind, pattern_type, pattern, priority, article_id, created_by)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(rule.kind.as_str())
    .bind(rule.pattern_type.as_str())
    .bind(rule.pattern)
    .bind(rule.priority)
    .bind(rule.article_id)
    .bind(rule.created_by)
    .execute(pool)
    .await?;
    Ok(res.last_insert_rowid())
}

/// Active rules in evaluation order: priority descending, id ascending.
pub async fn active_rules(pool: &DbPool) -> Result<Vec<MappingRule>, StorageError> {
    let rows: Vec<(i64, String, String, String, i64, i64)> = sqlx::query_as(
        r#"
        SELECT id, kind, pattern_type, pattern, priority, article_id
        FROM mapping_rules
        WHERE is_active = 1
        ORDER BY priority DESC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|(id, kind, pattern_type, pattern, priority, article_id)| {
            Ok(MappingRule {
                id,
                kind: decode_enum("kind", &kind)?,
                pattern_type: decode_enum("pattern_type", &pattern_type)?,
                pattern,
                priority,
                is_active: true,
                article_id,
            })
        })
        .collect()
}

pub async fn list_rules(pool: &DbPool) -> Result<Vec<RuleRecord>, StorageError> {
    let rows: Vec<(i64, String, String, String, i64, i64, i64, String)> = sqlx::query_as(
        r#"
        SELECT r.id, r.kind, r.pattern_type, r.pattern, r.priority, r.is_active,
               r.article_id, a.name
        FROM mapping_rules r
        JOIN finance_articles a ON a.id = r.article_id
        ORDER BY r.priority DESC, r.id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(
            |(id, kind, pattern_type, pattern, priority, is_active, article_id, article_name)| {
                Ok(RuleRecord {
                    id,
                    kind: decode_enum("kind", &kind)?,
                    pattern_type: decode_enum("pattern_type", &pattern_type)?,
                    pattern,
                    priority,
                    is_active: is_active != 0,
                    article_id,
                    article_name,
                })
            },
        )
        .collect()
}

/// Inserts one imported row. Runs against a connection so a whole import
/// can share a single database transaction. A fingerprint collision within
/// the same job surfaces as [`StorageError::DuplicateRow`].
pub async fn insert_transaction(
    conn: &mut SqliteConnection,
    new: &NewTransaction<'_>,
) -> Result<i64, StorageError> {
    let raw = serde_json::to_string(&new.row.raw_fields).unwrap_or_else(|_| "{}".to_string());
    let res = sqlx::query(
        r#"
        INSERT INTO finance_transactions
            (import_job_id, date, amount_cents, currency, tx_type, description,
             counterparty, income_article_id, expense_article_id, dedup_hash, raw_fields)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(new.import_job_id)
    .bind(new.row.date.map(fmt_date))
    .bind(new.row.amount.to_cents())
    .bind(&new.row.currency)
    .bind(new.tx_type.as_str())
    .bind(&new.row.description)
    .bind(&new.row.counterparty)
    .bind(new.income_article_id)
    .bind(new.expense_article_id)
    .bind(new.dedup_hash)
    .bind(raw)
    .execute(conn)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(d) if d.is_unique_violation() => StorageError::DuplicateRow {
            job_id: new.import_job_id,
        },
        _ => StorageError::Db(e),
    })?;
    Ok(res.last_insert_rowid())
}

pub async fn get_transaction(pool: &DbPool, id: i64) -> Result<TransactionRecord, StorageError> {
    let row: Option<(
        i64,
        i64,
        Option<String>,
        i64,
        String,
        String,
        String,
        String,
        Option<i64>,
        Option<i64>,
    )> = sqlx::query_as(
        r#"
        SELECT id, import_job_id, date, amount_cents, currency, tx_type,
               description, counterparty, income_article_id, expense_article_id
        FROM finance_transactions WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    let (
        id,
        import_job_id,
        date,
        amount_cents,
        currency,
        tx_type,
        description,
        counterparty,
        income_article_id,
        expense_article_id,
    ) = row.ok_or(StorageError::TransactionNotFound(id))?;
    Ok(TransactionRecord {
        id,
        import_job_id,
        date: date.as_deref().map(parse_date).transpose()?,
        amount: Money::from_cents(amount_cents),
        currency,
        tx_type: decode_enum("tx_type", &tx_type)?,
        description,
        counterparty,
        income_article_id,
        expense_article_id,
    })
}

/// Manually re-assigns a transaction to an article, overriding whatever the
/// rule engine decided at import time. The caller states the intended
/// transaction type; it must equal the article's kind, otherwise nothing
/// changes. Exactly one article column ends up set.
pub async fn assign_article(
    pool: &DbPool,
    transaction_id: i64,
    tx_type: TxType,
    article_id: i64,
) -> Result<(), StorageError> {
    let _ = get_transaction(pool, transaction_id).await?;
    let article = get_article(pool, article_id).await?;
    let (income_id, expense_id) = apply_article(tx_type, article.kind, article_id)?;
    sqlx::query(
        r#"
        UPDATE finance_transactions
        SET tx_type = ?, income_article_id = ?, expense_article_id = ?
        WHERE id = ?
        "#,
    )
    .bind(tx_type.as_str())
    .bind(income_id)
    .bind(expense_id)
    .bind(transaction_id)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_db_in_memory;
    use crate::jobs;
    use batchplant_core::ImportKind;
    use batchplant_import::ClassifyError;
    use std::collections::BTreeMap;

    fn sample_row(description: &str, amount: Money) -> FinanceRow {
        FinanceRow {
            date: NaiveDate::from_ymd_opt(2026, 3, 10),
            amount,
            currency: "KGS".to_string(),
            description: description.to_string(),
            counterparty: "ОсОО Ремикс".to_string(),
            tx_type_raw: None,
            raw_fields: BTreeMap::new(),
        }
    }

    async fn seed_job(pool: &DbPool) -> i64 {
        jobs::create_job(pool, ImportKind::Finance, "bank.xlsx", "blob/1", None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn article_unique_name() {
        let pool = create_db_in_memory().await.unwrap();
        create_article(&pool, TxType::Income, "Продажа бетона").await.unwrap();
        let err = create_article(&pool, TxType::Expense, "Продажа бетона")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ArticleExists(_)));
    }

    #[tokio::test]
    async fn create_rule_checks_article_kind() {
        let pool = create_db_in_memory().await.unwrap();
        let income = create_article(&pool, TxType::Income, "Продажа бетона").await.unwrap();

        let bad = NewRule {
            kind: TxType::Expense,
            pattern_type: PatternType::Contains,
            pattern: "бетон",
            priority: 100,
            article_id: income,
            created_by: None,
        };
        assert!(matches!(
            create_rule(&pool, &bad).await.unwrap_err(),
            StorageError::Classify(_)
        ));

        let missing = NewRule { article_id: 999, ..bad };
        assert!(matches!(
            create_rule(&pool, &missing).await.unwrap_err(),
            StorageError::ArticleNotFound(999)
        ));
    }

    #[tokio::test]
    async fn active_rules_ordering() {
        let pool = create_db_in_memory().await.unwrap();
        let article = create_article(&pool, TxType::Expense, "ГСМ").await.unwrap();
        for (pattern, priority) in [("а", 100), ("б", 200), ("в", 200)] {
            create_rule(
                &pool,
                &NewRule {
                    kind: TxType::Expense,
                    pattern_type: PatternType::Contains,
                    pattern,
                    priority,
                    article_id: article,
                    created_by: None,
                },
            )
            .await
            .unwrap();
        }
        let rules = active_rules(&pool).await.unwrap();
        let order: Vec<&str> = rules.iter().map(|r| r.pattern.as_str()).collect();
        assert_eq!(order, ["б", "в", "а"]);
    }

    #[tokio::test]
    async fn duplicate_fingerprint_within_job_rejected() {
        let pool = create_db_in_memory().await.unwrap();
        let job = seed_job(&pool).await;
        let row = sample_row("оплата за бетон", Money::from_cents(150_000));
        let new = NewTransaction {
            import_job_id: job,
            row: &row,
            tx_type: TxType::Unknown,
            income_article_id: None,
            expense_article_id: None,
            dedup_hash: "abc123",
        };

        let mut conn = pool.acquire().await.unwrap();
        insert_transaction(&mut conn, &new).await.unwrap();
        let err = insert_transaction(&mut conn, &new).await.unwrap_err();
        assert!(matches!(err, StorageError::DuplicateRow { job_id } if job_id == job));
    }

    #[tokio::test]
    async fn duplicate_fingerprint_across_jobs_allowed() {
        let pool = create_db_in_memory().await.unwrap();
        let job_a = seed_job(&pool).await;
        let job_b = seed_job(&pool).await;
        let row = sample_row("оплата за бетон", Money::from_cents(150_000));

        let mut conn = pool.acquire().await.unwrap();
        for job in [job_a, job_b] {
            insert_transaction(
                &mut conn,
                &NewTransaction {
                    import_job_id: job,
                    row: &row,
                    tx_type: TxType::Unknown,
                    income_article_id: None,
                    expense_article_id: None,
                    dedup_hash: "abc123",
                },
            )
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn assign_article_flips_type_and_columns() {
        let pool = create_db_in_memory().await.unwrap();
        let job = seed_job(&pool).await;
        let income = create_article(&pool, TxType::Income, "Продажа бетона").await.unwrap();
        let row = sample_row("поступление", Money::from_cents(300_000));

        let mut conn = pool.acquire().await.unwrap();
        let tx_id = insert_transaction(
            &mut conn,
            &NewTransaction {
                import_job_id: job,
                row: &row,
                tx_type: TxType::Unknown,
                income_article_id: None,
                expense_article_id: None,
                dedup_hash: "h1",
            },
        )
        .await
        .unwrap();
        drop(conn);

        assign_article(&pool, tx_id, TxType::Income, income).await.unwrap();
        let rec = get_transaction(&pool, tx_id).await.unwrap();
        assert_eq!(rec.tx_type, TxType::Income);
        assert_eq!(rec.income_article_id, Some(income));
        assert_eq!(rec.expense_article_id, None);
    }

    #[tokio::test]
    async fn assign_kind_mismatch_leaves_row_unchanged() {
        let pool = create_db_in_memory().await.unwrap();
        let job = seed_job(&pool).await;
        let expense = create_article(&pool, TxType::Expense, "Закуп цемента").await.unwrap();
        let row = sample_row("поступление", Money::from_cents(50_000));

        let mut conn = pool.acquire().await.unwrap();
        let tx_id = insert_transaction(
            &mut conn,
            &NewTransaction {
                import_job_id: job,
                row: &row,
                tx_type: TxType::Income,
                income_article_id: None,
                expense_article_id: None,
                dedup_hash: "h3",
            },
        )
        .await
        .unwrap();
        drop(conn);

        let err = assign_article(&pool, tx_id, TxType::Income, expense)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Classify(ClassifyError::KindMismatch { .. })
        ));
        let rec = get_transaction(&pool, tx_id).await.unwrap();
        assert_eq!(rec.tx_type, TxType::Income);
        assert_eq!(rec.income_article_id, None);
        assert_eq!(rec.expense_article_id, None);
    }

    #[tokio::test]
    async fn assign_missing_article_leaves_row_unchanged() {
        let pool = create_db_in_memory().await.unwrap();
        let job = seed_job(&pool).await;
        let row = sample_row("поступление", Money::from_cents(100));

        let mut conn = pool.acquire().await.unwrap();
        let tx_id = insert_transaction(
            &mut conn,
            &NewTransaction {
                import_job_id: job,
                row: &row,
                tx_type: TxType::Unknown,
                income_article_id: None,
                expense_article_id: None,
                dedup_hash: "h2",
            },
        )
        .await
        .unwrap();
        drop(conn);

        assert!(assign_article(&pool, tx_id, TxType::Income, 999).await.is_err());
        let rec = get_transaction(&pool, tx_id).await.unwrap();
        assert_eq!(rec.tx_type, TxType::Unknown);
        assert_eq!(rec.income_article_id, None);
    }
}
