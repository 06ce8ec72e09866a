//! Workbook export of the P&L report: a summary sheet per period bucket,
//! the per-day series and the top article rankings.

use rust_xlsxwriter::{Format, Workbook, XlsxError};

use batchplant_core::PnlTable;
use batchplant_storage::pnl::ArticleTotal;

pub fn pnl_workbook(
    table: &PnlTable,
    top_income: &[ArticleTotal],
    top_expense: &[ArticleTotal],
) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let sheet = workbook.add_worksheet().set_name("P&L")?;
    for (col, title) in ["Период", "Доход", "Расход", "Прибыль"].iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &bold)?;
    }
    let mut r = 1u32;
    for row in &table.rows {
        sheet.write_string(r, 0, row.period_start.to_string())?;
        sheet.write_number(r, 1, row.income_sum.to_f64())?;
        sheet.write_number(r, 2, row.expense_sum.to_f64())?;
        sheet.write_number(r, 3, row.net_profit().to_f64())?;
        r += 1;
    }
    sheet.write_string_with_format(r, 0, "Итого", &bold)?;
    sheet.write_number_with_format(r, 1, table.total_income.to_f64(), &bold)?;
    sheet.write_number_with_format(r, 2, table.total_expense.to_f64(), &bold)?;
    sheet.write_number_with_format(r, 3, table.total_net().to_f64(), &bold)?;

    let sheet = workbook.add_worksheet().set_name("Daily")?;
    for (col, title) in ["Дата", "Доход", "Расход", "Чистый"].iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &bold)?;
    }
    for (i, point) in table.daily.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_string(r, 0, point.date.to_string())?;
        sheet.write_number(r, 1, point.income.to_f64())?;
        sheet.write_number(r, 2, point.expense.to_f64())?;
        sheet.write_number(r, 3, point.net.to_f64())?;
    }

    let sheet = workbook.add_worksheet().set_name("Top Articles")?;
    sheet.write_string_with_format(0, 0, "Статьи дохода", &bold)?;
    sheet.write_string_with_format(0, 3, "Статьи расхода", &bold)?;
    for (col, title) in ["Статья", "Сумма"].iter().enumerate() {
        sheet.write_string_with_format(1, col as u16, *title, &bold)?;
        sheet.write_string_with_format(1, col as u16 + 3, *title, &bold)?;
    }
    for (i, a) in top_income.iter().enumerate() {
        let r = i as u32 + 2;
        sheet.write_string(r, 0, &a.name)?;
        sheet.write_number(r, 1, a.amount.to_f64())?;
    }
    for (i, a) in top_expense.iter().enumerate() {
        let r = i as u32 + 2;
        sheet.write_string(r, 3, &a.name)?;
        sheet.write_number(r, 4, a.amount.to_f64())?;
    }

    workbook.save_to_buffer()
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchplant_core::{aggregate, DateRange, DaySum, Money, ReportPeriod};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    #[test]
    fn workbook_renders_non_empty() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        let mut by_day = BTreeMap::new();
        by_day.insert(
            NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            DaySum {
                income: Money::from_cents(500_00),
                expense: Money::from_cents(200_00),
                unknown_rows: 0,
            },
        );
        let table = aggregate(DateRange { start, end }, ReportPeriod::Month, &by_day).unwrap();
        let top = vec![ArticleTotal {
            article_id: 1,
            name: "Продажа бетона".to_string(),
            amount: Money::from_cents(500_00),
        }];

        let bytes = pnl_workbook(&table, &top, &[]).unwrap();
        // xlsx is a zip container.
        assert_eq!(&bytes[..2], b"PK");
    }
}
