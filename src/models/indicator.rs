use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column names that identify the trading pair in scanner tables, tested in
/// order. The scanners write the localized header first.
pub const SYMBOL_COLUMN_CANDIDATES: &[&str] = &["交易对", "symbol", "Symbol", "SYMBOL"];

/// Column names that carry the candle interval of a scanner row, tested in
/// order.
pub const PERIOD_COLUMN_CANDIDATES: &[&str] = &["周期", "period", "Period", "PERIOD"];

/// One scanner row: column name to raw cell value.
pub type IndicatorRow = serde_json::Map<String, serde_json::Value>;

/// Contents of one scanner table, or why it could not be read.
///
/// Untagged: a list of rows or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndicatorTable {
    Rows(Vec<IndicatorRow>),
    Error { error: String },
}

impl IndicatorTable {
    pub fn error(err: impl ToString) -> Self {
        IndicatorTable::Error {
            error: err.to_string(),
        }
    }

    pub fn rows(&self) -> Option<&[IndicatorRow]> {
        match self {
            IndicatorTable::Rows(rows) => Some(rows),
            IndicatorTable::Error { .. } => None,
        }
    }
}

/// Result of scanning the whole indicator store for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorScan {
    /// Tables with at least one matching row, plus per-table failures.
    Tables(BTreeMap<String, IndicatorTable>),
    /// The store file is missing or could not be opened at all.
    Unavailable { error: String },
}

/// First candidate symbol column present in `columns`.
pub fn find_symbol_column<S: AsRef<str>>(columns: &[S]) -> Option<&'static str> {
    first_present(SYMBOL_COLUMN_CANDIDATES, |cand| {
        columns.iter().any(|c| c.as_ref() == cand)
    })
}

/// Period label of a row, taken from the first candidate column it has.
pub fn row_period(row: &IndicatorRow) -> Option<&str> {
    first_present(PERIOD_COLUMN_CANDIDATES, |cand| row.contains_key(cand))
        .and_then(|col| row.get(col))
        .and_then(|v| v.as_str())
}

fn first_present(
    candidates: &'static [&'static str],
    present: impl Fn(&str) -> bool,
) -> Option<&'static str> {
    candidates.iter().copied().find(|&cand| present(cand))
}
