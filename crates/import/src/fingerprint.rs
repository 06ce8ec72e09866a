//! Row fingerprinting for per-job deduplication.

use sha2::{Digest, Sha256};

use crate::finance::FinanceRow;

/// SHA-256 hex over the pipe-joined pre-classification fields. The type
/// component is the raw spreadsheet cell text, so the fingerprint of a row
/// is stable across rule changes and re-classification. Uniqueness is
/// enforced per import job by the storage layer; identical rows in two
/// different jobs are both accepted.
pub fn dedup_hash(row: &FinanceRow) -> String {
    let date = row.date.map(|d| d.to_string()).unwrap_or_default();
    let base = format!(
        "{}|{}|{}|{}|{}|{}",
        date,
        row.amount.to_cents(),
        row.currency,
        row.description,
        row.counterparty,
        row.tx_type_raw.as_deref().unwrap_or(""),
    );
    hex::encode(Sha256::digest(base.as_bytes()))
}
