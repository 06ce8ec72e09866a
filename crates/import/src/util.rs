//! Cell-level coercions shared by both spreadsheet layouts. Parsing here is
//! deliberately forgiving: a malformed money or date cell degrades to
//! zero/None instead of failing the whole import.

use batchplant_core::Money;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Normalizes a header cell for synonym matching: trim, lowercase, newlines
/// and tabs to spaces, collapsed whitespace, `ё` folded to `е`.
pub fn norm_header(s: &str) -> String {
    let lowered = s.trim().to_lowercase();
    let replaced: String = lowered
        .chars()
        .map(|c| match c {
            '\n' | '\t' => ' ',
            'ё' => 'е',
            other => other,
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes free text for rule matching: trim + lowercase.
pub fn normalize_text(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Normalizes a counterparty name for lookups: lowercase, quotes stripped,
/// whitespace collapsed.
pub fn norm_counterparty_name(s: &str) -> String {
    let cleaned: String = s
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| *c != '"' && *c != '\'')
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tries the accepted date formats in order; unknown layouts yield `None`.
pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// Parses a money cell: spaces (incl. NBSP thousands separators) stripped,
/// decimal comma normalized to a dot. Unparseable input degrades to zero.
pub fn parse_money_str(s: &str) -> Money {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return Money::zero();
    }
    Decimal::from_str(&cleaned)
        .map(Money::from_decimal)
        .unwrap_or_else(|_| Money::zero())
}
