//! Background processing of uploaded spreadsheets. The upload handler
//! stores the file and the job row, then hands off to a spawned task so the
//! request returns immediately.

use anyhow::Context;
use chrono::Utc;

use batchplant_core::{ImportKind, TxType};
use batchplant_import::{
    apply_article, dedup_hash, parse_counterparty_xlsx, parse_finance_xlsx, RuleEngine,
};
use batchplant_storage::{counterparty, finance, jobs, NewTransaction};

use crate::state::AppState;

pub fn spawn_import(state: AppState, job_id: i64) {
    tokio::spawn(async move {
        run_import(state, job_id).await;
    });
}

async fn run_import(state: AppState, job_id: i64) {
    let result = process(&state, job_id).await;
    match result {
        Ok(summary) => {
            tracing::info!(job_id, %summary, "import done");
            if let Err(e) = jobs::mark_done(&state.db, job_id, &summary).await {
                tracing::error!(job_id, "cannot mark import done: {e}");
            }
        }
        Err(e) => {
            tracing::error!(job_id, "import failed: {e:#}");
            if let Err(e) = jobs::mark_failed(&state.db, job_id, &format!("{e:#}")).await {
                tracing::error!(job_id, "cannot mark import failed: {e}");
            }
        }
    }
}

async fn process(state: &AppState, job_id: i64) -> anyhow::Result<serde_json::Value> {
    let job = jobs::get_job(&state.db, job_id).await?;
    jobs::mark_processing(&state.db, job_id).await?;
    let data = state
        .blobs
        .get(&job.blob_key)
        .await
        .with_context(|| format!("reading blob {}", job.blob_key))?;

    match job.kind {
        ImportKind::Finance => process_finance(state, job_id, &data).await,
        ImportKind::Counterparty => process_counterparty(state, job_id, &data).await,
    }
}

async fn process_finance(
    state: &AppState,
    job_id: i64,
    data: &[u8],
) -> anyhow::Result<serde_json::Value> {
    let rows = parse_finance_xlsx(data, &state.config.default_currency)?;
    let engine = RuleEngine::new(finance::active_rules(&state.db).await?);
    let article_kinds = finance::article_kinds(&state.db).await?;

    let mut unknown = 0u64;

    // One database transaction per file. Any failed insert, a repeated row
    // included, rolls the whole file back so a partial import never lands.
    let mut tx = state.db.begin().await?;
    for row in &rows {
        let hash = dedup_hash(row);
        let (tx_type, article_id) = engine.classify(&row.description, &row.counterparty);

        let (income_id, expense_id) = match article_id
            .and_then(|id| article_kinds.get(&id).map(|kind| (id, *kind)))
        {
            Some((id, kind)) => match apply_article(tx_type, kind, id) {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(job_id, "rule hit not applied: {e}");
                    (None, None)
                }
            },
            None => (None, None),
        };
        if tx_type == TxType::Unknown {
            unknown += 1;
        }

        let new = NewTransaction {
            import_job_id: job_id,
            row,
            tx_type,
            income_article_id: income_id,
            expense_article_id: expense_id,
            dedup_hash: &hash,
        };
        finance::insert_transaction(&mut *tx, &new).await?;
    }
    tx.commit().await?;

    Ok(serde_json::json!({
        "rows": rows.len(),
        "unknown": unknown,
    }))
}

async fn process_counterparty(
    state: &AppState,
    job_id: i64,
    data: &[u8],
) -> anyhow::Result<serde_json::Value> {
    let rows = parse_counterparty_xlsx(data)?;
    let snapshot_date = Utc::now().date_naive();

    let mut tx = state.db.begin().await?;
    let snapshot_id = counterparty::create_snapshot(&mut *tx, snapshot_date, job_id).await?;
    for row in &rows {
        counterparty::insert_balance(&mut *tx, snapshot_id, row).await?;
    }
    tx.commit().await?;

    Ok(serde_json::json!({
        "rows": rows.len(),
        "snapshot_id": snapshot_id,
        "snapshot_date": snapshot_date.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::NaiveDate;
    use rust_xlsxwriter::Workbook;

    use batchplant_core::{DateRange, JobStatus};
    use batchplant_storage::{create_db_in_memory, pnl};

    use crate::blob::FsBlobStore;
    use crate::config::Config;

    fn finance_xlsx(rows: &[&[&str]]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                sheet.write_string(r as u32, c as u16, *value).expect("write cell");
            }
        }
        workbook.save_to_buffer().expect("save workbook")
    }

    async fn test_state(blob_root: &std::path::Path) -> AppState {
        AppState {
            db: create_db_in_memory().await.unwrap(),
            blobs: FsBlobStore::new(blob_root),
            config: Arc::new(Config::default()),
        }
    }

    #[tokio::test]
    async fn repeated_row_fails_job_and_imports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let data = finance_xlsx(&[
            &["Дата", "Сумма", "Валюта", "Назначение", "Контрагент"],
            &["2026-03-10", "1000", "KGS", "Оплата за бетон", "ОсОО СтройИнвест"],
            &["2026-03-10", "1000", "KGS", "Оплата за бетон", "ОсОО СтройИнвест"],
        ]);
        state.blobs.put("imports/dup.xlsx", &data).await.unwrap();
        let job_id = jobs::create_job(
            &state.db,
            ImportKind::Finance,
            "dup.xlsx",
            "imports/dup.xlsx",
            None,
        )
        .await
        .unwrap();

        run_import(state.clone(), job_id).await;

        let job = jobs::get_job(&state.db, job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(!job.error.is_empty());

        let day = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let sums = pnl::day_sums(&state.db, DateRange::new(day, day))
            .await
            .unwrap();
        assert!(sums.is_empty());
    }

    #[tokio::test]
    async fn distinct_rows_import_and_finish_done() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;

        let data = finance_xlsx(&[
            &["Дата", "Сумма", "Валюта", "Назначение", "Контрагент"],
            &["2026-03-10", "1000", "KGS", "Оплата за бетон", "ОсОО СтройИнвест"],
            &["2026-03-11", "-400", "KGS", "Дизель", "АЗС Бишкек"],
        ]);
        state.blobs.put("imports/ok.xlsx", &data).await.unwrap();
        let job_id = jobs::create_job(
            &state.db,
            ImportKind::Finance,
            "ok.xlsx",
            "imports/ok.xlsx",
            None,
        )
        .await
        .unwrap();

        run_import(state.clone(), job_id).await;

        let job = jobs::get_job(&state.db, job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.summary["rows"], 2);
    }
}
