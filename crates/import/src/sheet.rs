//! Thin layer over calamine: worksheet access, cell coercions, and the
//! synonym-driven header-row scan shared by both import layouts.

use batchplant_core::Money;
use calamine::{Data, Reader, Xlsx};
use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;

use crate::util::{norm_header, parse_date_str, parse_money_str};
use crate::ImportError;

/// Field name → accepted header spellings, already normalized.
pub(crate) type SynonymTable = &'static [(&'static str, &'static [&'static str])];

pub(crate) fn read_rows(data: &[u8]) -> Result<Vec<Vec<Data>>, ImportError> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(data)).map_err(|e| ImportError::Workbook(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ImportError::NoWorksheet)?
        .map_err(|e| ImportError::Workbook(e.to_string()))?;
    Ok(range.rows().map(|r| r.to_vec()).collect())
}

/// Scans the first `max_scan` rows for one that resolves the mandatory
/// field set. Returns the header row index and the field → column map.
/// Not finding a header is fatal to the import, per contract.
pub(crate) fn find_header_row(
    rows: &[Vec<Data>],
    synonyms: SynonymTable,
    max_scan: usize,
    is_complete: fn(&HashMap<&'static str, usize>) -> bool,
    layout: &'static str,
) -> Result<(usize, HashMap<&'static str, usize>), ImportError> {
    for (row_idx, row) in rows.iter().enumerate().take(max_scan) {
        let headers: Vec<String> = row.iter().map(|c| norm_header(&cell_text(c))).collect();
        let mut columns: HashMap<&'static str, usize> = HashMap::new();
        for &(field, spellings) in synonyms {
            if let Some(col) = headers
                .iter()
                .position(|h| spellings.contains(&h.as_str()))
            {
                columns.insert(field, col);
            }
        }
        if is_complete(&columns) {
            return Ok((row_idx, columns));
        }
    }
    Err(ImportError::HeaderNotFound(layout))
}

pub(crate) fn cell_text(c: &Data) -> String {
    match c {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|ndt| ndt.to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
    }
}

pub(crate) fn cell_date(c: &Data) -> Option<NaiveDate> {
    match c {
        Data::DateTime(dt) => dt.as_datetime().map(|ndt| ndt.date()),
        Data::DateTimeIso(s) => s.get(..10).and_then(parse_date_str),
        Data::String(s) => parse_date_str(s),
        _ => None,
    }
}

pub(crate) fn cell_money(c: &Data) -> Money {
    match c {
        Data::Float(f) => Money::from_decimal(Decimal::from_f64(*f).unwrap_or(Decimal::ZERO)),
        Data::Int(i) => Money::from_decimal(Decimal::from(*i)),
        Data::String(s) => parse_money_str(s),
        _ => Money::zero(),
    }
}

pub(crate) fn is_blank_row(row: &[Data]) -> bool {
    row.iter().all(|c| cell_text(c).trim().is_empty())
}

/// Original cell values keyed by column index, kept for audit/debugging.
/// Core logic never branches on this map.
pub(crate) fn raw_fields(row: &[Data]) -> BTreeMap<String, String> {
    row.iter()
        .enumerate()
        .map(|(i, c)| (i.to_string(), cell_text(c)))
        .collect()
}
