//! Reader for the scanner output SQLite file.
//!
//! The scanners create one table per report and the schema drifts between
//! releases, so tables and columns are discovered on every call. A table
//! is included only if it has a symbol column and at least one matching row;
//! a table that fails to read is reported inline and the scan moves on.

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::IndicatorError;
use crate::models::indicator::find_symbol_column;
use crate::models::{IndicatorRow, IndicatorScan, IndicatorTable};

#[async_trait]
pub trait IndicatorSource: Send + Sync {
    async fn read_indicators(&self, symbol: &str) -> IndicatorScan;
}

pub struct IndicatorStore {
    path: PathBuf,
}

impl IndicatorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Blocking scan of every table for rows of `symbol`.
    pub fn scan(&self, symbol: &str) -> IndicatorScan {
        match scan_store(&self.path, symbol) {
            Ok(tables) => IndicatorScan::Tables(tables),
            Err(e) => unavailable(e),
        }
    }
}

#[async_trait]
impl IndicatorSource for IndicatorStore {
    async fn read_indicators(&self, symbol: &str) -> IndicatorScan {
        let path = self.path.clone();
        let symbol = symbol.to_string();

        match tokio::task::spawn_blocking(move || IndicatorStore::new(path).scan(&symbol)).await {
            Ok(scan) => scan,
            Err(e) => unavailable(IndicatorError::from(e)),
        }
    }
}

fn unavailable(err: IndicatorError) -> IndicatorScan {
    warn!(error = %err, "Indicator store unavailable");
    IndicatorScan::Unavailable {
        error: err.to_string(),
    }
}

/// Open read-write, falling back to strictly read-only. Never creates the file.
fn open_store(path: &Path) -> Result<Connection, IndicatorError> {
    if !path.exists() {
        return Err(IndicatorError::Missing(path.to_path_buf()));
    }

    let rw = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    match Connection::open_with_flags(path, rw) {
        Ok(conn) => Ok(conn),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Read-write open failed, retrying read-only");
            let ro = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
            Ok(Connection::open_with_flags(path, ro)?)
        }
    }
}

fn scan_store(
    path: &Path,
    symbol: &str,
) -> Result<BTreeMap<String, IndicatorTable>, IndicatorError> {
    let conn = open_store(path)?;
    let mut tables = BTreeMap::new();

    for table in list_tables(&conn)? {
        match read_table(&conn, &table, symbol) {
            Ok(Some(rows)) => {
                tables.insert(table, IndicatorTable::Rows(rows));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(table = %table, error = %e, "Failed to read indicator table");
                tables.insert(table, IndicatorTable::error(e));
            }
        }
    }

    debug!(symbol = %symbol, tables = tables.len(), "Scanned indicator store");
    Ok(tables)
}

fn list_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
    let columns = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Matching rows of one table, or `None` when the table has no symbol column
/// or no row for `symbol`.
fn read_table(
    conn: &Connection,
    table: &str,
    symbol: &str,
) -> rusqlite::Result<Option<Vec<IndicatorRow>>> {
    let columns = table_columns(conn, table)?;
    if columns.is_empty() {
        return Ok(None);
    }
    let Some(symbol_col) = find_symbol_column(&columns) else {
        return Ok(None);
    };

    let sql = format!(
        "SELECT * FROM {} WHERE {} = ?1",
        quote_ident(table),
        quote_ident(symbol_col)
    );
    let mut stmt = conn.prepare(&sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let rows = stmt
        .query_map([symbol], |row| {
            let mut map = IndicatorRow::new();
            for (idx, name) in names.iter().enumerate() {
                map.insert(name.clone(), sqlite_to_json(row.get::<_, Value>(idx)?));
            }
            Ok(map)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((!rows.is_empty()).then_some(rows))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sqlite_to_json(value: Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::from(i),
        Value::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s),
        Value::Blob(bytes) => serde_json::Value::String(hex::encode(bytes)),
    }
}
