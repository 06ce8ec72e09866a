//! SQLite persistence for the batch plant backend: articles and mapping
//! rules, imported transactions, pricing versions, recipes, counterparty
//! snapshots and the audit trail.

pub mod audit;
pub mod counterparty;
pub mod db;
pub mod finance;
pub mod jobs;
pub mod pnl;
pub mod pricing;
pub mod recipes;

pub use db::{create_db, create_db_in_memory, DbPool};
pub use finance::{Article, NewRule, NewTransaction, RuleRecord, TransactionRecord};
pub use jobs::ImportJob;
pub use pricing::{MaterialPrice, OverheadCost, PriceVersion};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("article {0} not found")]
    ArticleNotFound(i64),
    #[error("article '{0}' already exists")]
    ArticleExists(String),
    #[error("transaction {0} not found")]
    TransactionNotFound(i64),
    #[error("import job {0} not found")]
    JobNotFound(i64),
    #[error(transparent)]
    Classify(#[from] batchplant_import::ClassifyError),
    #[error("duplicate row fingerprint in import job {job_id}")]
    DuplicateRow { job_id: i64 },
    #[error("corrupt {field} value in database: '{value}'")]
    Corrupt { field: &'static str, value: String },
}

/// Decodes a stored enum column, mapping a bad value to [`StorageError::Corrupt`].
pub(crate) fn decode_enum<T>(field: &'static str, value: &str) -> Result<T, StorageError>
where
    T: std::str::FromStr,
{
    value.parse().map_err(|_| StorageError::Corrupt {
        field,
        value: value.to_string(),
    })
}
