pub mod classify;
pub mod counterparty;
pub mod finance;
pub mod fingerprint;
pub(crate) mod sheet;
pub mod util;

pub use classify::{apply_article, ClassifyError, MappingRule, RuleEngine};
pub use counterparty::{parse_counterparty_xlsx, CounterpartyRow};
pub use finance::{parse_finance_xlsx, FinanceRow};
pub use fingerprint::dedup_hash;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("cannot read workbook: {0}")]
    Workbook(String),
    #[error("workbook has no worksheets")]
    NoWorksheet,
    #[error("cannot detect header row for {0} import")]
    HeaderNotFound(&'static str),
}
