//! Counterparty balance snapshot importer (receivables/payables per
//! counterparty, money and in-kind).

use batchplant_core::Money;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::sheet::{
    cell_money, cell_text, find_header_row, is_blank_row, raw_fields, read_rows, SynonymTable,
};
use crate::util::norm_counterparty_name;
use crate::ImportError;

/// 1C-style exports bury the table deeper than bank statements do.
const HEADER_SCAN_ROWS: usize = 20;

const SYNONYMS: SynonymTable = &[
    (
        "counterparty_name",
        &[
            "counterparty_name",
            "контрагент",
            "наименование контрагента",
            "контрагент наименование",
            "наименование",
        ],
    ),
    (
        "receivable_money",
        &[
            "receivable_money",
            "дебиторка",
            "нам должны деньги",
            "задолженность нам (деньги)",
            "дебиторская задолженность (деньги)",
        ],
    ),
    (
        "receivable_assets",
        &[
            "receivable_assets",
            "нам должны активами",
            "дебиторка (активы)",
            "задолженность нам (активы)",
        ],
    ),
    (
        "payable_money",
        &[
            "payable_money",
            "кредиторка",
            "мы должны деньги",
            "задолженность наша (деньги)",
            "кредиторская задолженность (деньги)",
        ],
    ),
    (
        "payable_assets",
        &[
            "payable_assets",
            "мы должны активами",
            "кредиторка (активы)",
            "задолженность наша (активы)",
        ],
    ),
    (
        "ending_balance_money",
        &[
            "ending_balance_money",
            "сальдо конечное",
            "конечное сальдо",
            "итого",
            "сальдо",
        ],
    ),
];

fn has_minimum_fields(columns: &HashMap<&'static str, usize>) -> bool {
    columns.contains_key("counterparty_name")
        && (columns.contains_key("ending_balance_money")
            || columns.contains_key("receivable_money")
            || columns.contains_key("payable_money"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterpartyRow {
    pub counterparty_name: String,
    pub counterparty_name_norm: String,
    pub receivable_money: Money,
    pub receivable_assets: String,
    pub payable_money: Money,
    pub payable_assets: String,
    pub ending_balance_money: Money,
    pub raw_fields: BTreeMap<String, String>,
}

pub fn parse_counterparty_xlsx(data: &[u8]) -> Result<Vec<CounterpartyRow>, ImportError> {
    let rows = read_rows(data)?;
    let (header_idx, columns) = find_header_row(
        &rows,
        SYNONYMS,
        HEADER_SCAN_ROWS,
        has_minimum_fields,
        "counterparty",
    )?;

    let text_at = |row: &[calamine::Data], field: &str| -> String {
        columns
            .get(field)
            .and_then(|&col| row.get(col))
            .map(|c| cell_text(c).trim().to_string())
            .unwrap_or_default()
    };
    let money_at = |row: &[calamine::Data], field: &str| -> Money {
        columns
            .get(field)
            .and_then(|&col| row.get(col))
            .map(cell_money)
            .unwrap_or_else(Money::zero)
    };

    let mut out = Vec::new();
    for row in rows.iter().skip(header_idx + 1) {
        if is_blank_row(row) {
            continue;
        }
        let name = text_at(row, "counterparty_name");
        out.push(CounterpartyRow {
            counterparty_name_norm: norm_counterparty_name(&name),
            counterparty_name: name,
            receivable_money: money_at(row, "receivable_money"),
            receivable_assets: text_at(row, "receivable_assets"),
            payable_money: money_at(row, "payable_money"),
            payable_assets: text_at(row, "payable_assets"),
            ending_balance_money: money_at(row, "ending_balance_money"),
            raw_fields: raw_fields(row),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn xlsx_bytes(rows: &[&[&str]]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                sheet
                    .write_string(r as u32, c as u16, *value)
                    .expect("write cell");
            }
        }
        workbook.save_to_buffer().expect("save workbook")
    }

    #[test]
    fn detects_balance_sheet_headers() {
        let data = xlsx_bytes(&[
            &[
                "Наименование контрагента",
                "Нам должны деньги",
                "Нам должны активами",
                "Мы должны деньги",
                "Мы должны активами",
                "Сальдо конечное",
            ],
            &["ОсОО СтройИнвест", "500000", "цемент 50 мешков", "0", "", "500000"],
        ]);
        let rows = parse_counterparty_xlsx(&data).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.counterparty_name, "ОсОО СтройИнвест");
        assert_eq!(row.counterparty_name_norm, "осоо стройинвест");
        assert_eq!(row.receivable_money.to_cents(), 500_000_00);
        assert!(row.receivable_assets.to_lowercase().contains("цемент"));
        assert_eq!(row.ending_balance_money.to_cents(), 500_000_00);
    }

    #[test]
    fn name_plus_single_balance_column_is_enough() {
        let data = xlsx_bytes(&[
            &["Контрагент", "Сальдо"],
            &["ИП Асанов", "-1200,75"],
        ]);
        let rows = parse_counterparty_xlsx(&data).unwrap();
        assert_eq!(rows[0].ending_balance_money.to_cents(), -1200_75);
        assert!(rows[0].receivable_money.is_zero());
    }

    #[test]
    fn missing_header_fails_whole_import() {
        let data = xlsx_bytes(&[&["Итоговый отчет"], &["без таблицы"]]);
        assert!(matches!(
            parse_counterparty_xlsx(&data),
            Err(ImportError::HeaderNotFound("counterparty"))
        ));
    }
}
