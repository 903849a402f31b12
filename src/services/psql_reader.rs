//! Fallback candle reader that shells out to `psql`.
//!
//! Used when the driver path fails. One child process per interval; a failing
//! child only empties its own interval.

use async_trait::async_trait;
use std::process::Stdio;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::MarketDataConfig;
use crate::error::ReaderError;
use crate::models::{Candle, Interval, IntervalSeries};
use crate::services::candle_reader::CandleReader;
use crate::services::timescale_reader::candles_sql;

/// Fields every output line must carry: timestamp through volume.
const REQUIRED_FIELDS: usize = 6;

#[derive(Debug, Error, PartialEq)]
enum LineError {
    #[error("expected at least 6 fields, got {0}")]
    TooFewFields(usize),
    #[error("field {index} is not a number: {value:?}")]
    InvalidNumber { index: usize, value: String },
}

pub struct CliReader {
    config: Arc<MarketDataConfig>,
}

impl CliReader {
    pub fn new(config: Arc<MarketDataConfig>) -> Self {
        Self { config }
    }

    fn command(&self, sql: &str) -> Command {
        let cfg = &self.config;
        let mut cmd = Command::new(&cfg.psql_bin);
        cmd.arg("-h")
            .arg(&cfg.host)
            .arg("-p")
            .arg(cfg.port.to_string())
            .arg("-U")
            .arg(&cfg.user)
            .arg("-d")
            .arg(&cfg.database)
            .args(["-A", "-F", ",", "-q", "-t", "-P", "footer=off", "-c"])
            .arg(sql)
            .env("PGPASSWORD", &cfg.password)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    /// Candles for one interval; empty on any process failure.
    async fn read_interval(&self, symbol: &str, interval: Interval) -> Vec<Candle> {
        let table = self.config.candles_table(interval);
        let sql = candles_sql(&table, &quote_literal(symbol));
        let limit = self.config.cli_timeout;

        let output = match tokio::time::timeout(limit, self.command(&sql).output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(
                    symbol = %symbol,
                    interval = %interval,
                    error = %e,
                    "Failed to spawn psql"
                );
                return Vec::new();
            }
            Err(_) => {
                warn!(
                    symbol = %symbol,
                    interval = %interval,
                    timeout_secs = limit.as_secs(),
                    "psql timed out, child killed"
                );
                return Vec::new();
            }
        };

        if !output.status.success() {
            warn!(
                symbol = %symbol,
                interval = %interval,
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "psql exited with failure"
            );
            return Vec::new();
        }

        let candles = parse_psql_output(&String::from_utf8_lossy(&output.stdout));
        debug!(
            symbol = %symbol,
            interval = %interval,
            rows = candles.len(),
            "Fetched candles via psql"
        );
        candles
    }
}

#[async_trait]
impl CandleReader for CliReader {
    /// Never fails: every requested interval gets a (possibly empty) sequence.
    async fn read_candles(
        &self,
        symbol: &str,
        intervals: &[Interval],
    ) -> Result<IntervalSeries, ReaderError> {
        let mut series = IntervalSeries::new();
        for &interval in intervals {
            let candles = self.read_interval(symbol, interval).await;
            series.insert(interval, candles);
        }
        Ok(series)
    }
}

/// SQL string literal with embedded single quotes doubled.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Parse unaligned, tuples-only `psql` output (`-A -F , -t`) into candles.
/// Blank and malformed lines are skipped.
pub fn parse_psql_output(stdout: &str) -> Vec<Candle> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match parse_line(line) {
            Ok(candle) => Some(candle),
            Err(e) => {
                warn!(line = %line, error = %e, "Skipping malformed psql line");
                None
            }
        })
        .collect()
}

fn parse_line(line: &str) -> Result<Candle, LineError> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < REQUIRED_FIELDS {
        return Err(LineError::TooFewFields(parts.len()));
    }

    Ok(Candle {
        bucket_ts: field(&parts, 0).map(str::to_string),
        open: number(&parts, 1)?,
        high: number(&parts, 2)?,
        low: number(&parts, 3)?,
        close: number(&parts, 4)?,
        volume: number(&parts, 5)?,
        quote_volume: number(&parts, 6)?,
        trade_count: number(&parts, 7)?,
        taker_buy_volume: number(&parts, 8)?,
        taker_buy_quote_volume: number(&parts, 9)?,
    })
}

/// Absent and empty fields are both SQL NULL in unaligned output.
fn field<'a>(parts: &[&'a str], index: usize) -> Option<&'a str> {
    parts
        .get(index)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

fn number<T: FromStr>(parts: &[&str], index: usize) -> Result<Option<T>, LineError> {
    field(parts, index)
        .map(|raw| {
            raw.parse::<T>().map_err(|_| LineError::InvalidNumber {
                index,
                value: raw.to_string(),
            })
        })
        .transpose()
}
