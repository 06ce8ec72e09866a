//! Finance-statement importer. Bank exports vary by source, so the header
//! row is located by synonym matching rather than a fixed position.

use batchplant_core::Money;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::sheet::{
    cell_date, cell_money, cell_text, find_header_row, is_blank_row, raw_fields, read_rows,
    SynonymTable,
};
use crate::ImportError;

/// Finance imports scan a slightly smaller window than counterparty ones;
/// bank exports put their preamble in the first dozen rows.
const HEADER_SCAN_ROWS: usize = 15;

const SYNONYMS: SynonymTable = &[
    ("date", &["date", "дата", "дата документа", "период"]),
    (
        "amount",
        &[
            "amount",
            "сумма",
            "сумма документа",
            "сумма операции",
            "сумма к оплате",
        ],
    ),
    ("currency", &["currency", "валюта", "вал"]),
    (
        "description",
        &[
            "description",
            "назначение",
            "комментарий",
            "содержание",
            "операция",
            "основание",
        ],
    ),
    (
        "counterparty",
        &[
            "counterparty",
            "контрагент",
            "наименование контрагента",
            "контрагент наименование",
        ],
    ),
    ("tx_type", &["type", "вид", "приход/расход", "движение", "тип"]),
];

fn has_minimum_fields(columns: &HashMap<&'static str, usize>) -> bool {
    columns.contains_key("amount")
        && (columns.contains_key("date") || columns.contains_key("description"))
}

/// One parsed statement row, prior to classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinanceRow {
    pub date: Option<NaiveDate>,
    pub amount: Money,
    pub currency: String,
    pub description: String,
    pub counterparty: String,
    /// The raw type column text as found in the file, if any. This is what
    /// the fingerprint hashes — never the classifier output.
    pub tx_type_raw: Option<String>,
    pub raw_fields: BTreeMap<String, String>,
}

/// Parses finance statement bytes into typed rows, or fails with
/// `HeaderNotFound` when no row in the scan window resolves `amount` plus
/// one of `date`/`description`.
pub fn parse_finance_xlsx(
    data: &[u8],
    default_currency: &str,
) -> Result<Vec<FinanceRow>, ImportError> {
    let rows = read_rows(data)?;
    let (header_idx, columns) =
        find_header_row(&rows, SYNONYMS, HEADER_SCAN_ROWS, has_minimum_fields, "finance")?;

    let mut out = Vec::new();
    for row in rows.iter().skip(header_idx + 1) {
        if is_blank_row(row) {
            continue;
        }

        let date = columns
            .get("date")
            .and_then(|&col| row.get(col))
            .and_then(cell_date);
        let amount = columns
            .get("amount")
            .and_then(|&col| row.get(col))
            .map(cell_money)
            .unwrap_or_else(Money::zero);
        let currency = columns
            .get("currency")
            .and_then(|&col| row.get(col))
            .map(|c| cell_text(c).trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default_currency.to_string());
        let description = columns
            .get("description")
            .and_then(|&col| row.get(col))
            .map(|c| cell_text(c).trim().to_string())
            .unwrap_or_default();
        let counterparty = columns
            .get("counterparty")
            .and_then(|&col| row.get(col))
            .map(|c| cell_text(c).trim().to_string())
            .unwrap_or_default();
        let tx_type_raw = columns
            .get("tx_type")
            .and_then(|&col| row.get(col))
            .map(|c| cell_text(c).trim().to_lowercase())
            .filter(|s| !s.is_empty());

        out.push(FinanceRow {
            date,
            amount,
            currency,
            description,
            counterparty,
            tx_type_raw,
            raw_fields: raw_fields(row),
        });
    }
    Ok(out)
}
