//! Payload assembly for one (symbol, interval) request.
//!
//! Every source is trimmed so the serialized payload stays well under the
//! prompt size ceiling:
//! - candles: requested interval plus one neighbour, 20 rows each
//! - futures metrics: 10 rows
//! - indicators: 6 allow-listed scanner tables, rows of the requested period, 5 each

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::MarketDataConfig;
use crate::models::indicator::row_period;
use crate::models::{IndicatorScan, IndicatorTable, Interval, IntervalSeries, Payload};
use crate::services::candle_reader::{CandleReader, DefaultCandleReader, FallbackReader};
use crate::services::indicator_store::{IndicatorSource, IndicatorStore};
use crate::services::metrics_reader::{MetricsReader, MetricsSource};
use crate::services::psql_reader::CliReader;
use crate::services::timescale_reader::NetworkReader;

pub const CANDLES_PER_INTERVAL: usize = 20;
pub const METRICS_LIMIT: usize = 10;
pub const INDICATOR_ROWS_PER_TABLE: usize = 5;

/// Scanner tables forwarded to the prompt, in the scanners' own names.
pub const INDICATOR_ALLOW_LIST: [&str; 6] = [
    "MACD柱状扫描器.py",
    "布林带扫描器.py",
    "KDJ随机指标扫描器.py",
    "ATR波幅扫描器.py",
    "成交量比率扫描器.py",
    "主动买卖比扫描器.py",
];

pub struct PayloadBuilder<C = DefaultCandleReader, M = MetricsReader, I = IndicatorStore> {
    candles: C,
    metrics: M,
    indicators: I,
}

impl PayloadBuilder {
    /// Production wiring: TimescaleDB with `psql` fallback, metrics from the
    /// same store, indicators from the configured SQLite file.
    pub fn from_config(config: Arc<MarketDataConfig>) -> Self {
        let candles = FallbackReader::new(
            NetworkReader::new(config.clone()),
            CliReader::new(config.clone()),
        );
        let metrics = MetricsReader::new(config.clone());
        let indicators = IndicatorStore::new(config.indicator_db.clone());

        Self::new(candles, metrics, indicators)
    }
}

impl<C, M, I> PayloadBuilder<C, M, I>
where
    C: CandleReader,
    M: MetricsSource,
    I: IndicatorSource,
{
    pub fn new(candles: C, metrics: M, indicators: I) -> Self {
        Self {
            candles,
            metrics,
            indicators,
        }
    }

    /// Build the payload. Never fails: missing data shows up as empty
    /// sequences or inline error descriptors.
    pub async fn fetch_payload(&self, symbol: &str, interval: Interval) -> Payload {
        let intervals = interval.with_neighbor();

        let fetched = match self.candles.read_candles(symbol, intervals).await {
            Ok(series) => series,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Candle readers failed, sending empty candles");
                IntervalSeries::new()
            }
        };
        let candles = trim_candles(fetched, intervals);

        let mut metrics = self.metrics.read_metrics(symbol).await;
        metrics.truncate(METRICS_LIMIT);

        let scan = self.indicators.read_indicators(symbol).await;
        let indicators = select_indicators(scan, interval);

        info!(
            symbol = %symbol,
            interval = %interval,
            candle_intervals = candles.len(),
            candles = candles.values().map(Vec::len).sum::<usize>(),
            metrics = metrics.len(),
            indicator_tables = indicators.len(),
            "Assembled market payload"
        );

        Payload {
            symbol: symbol.to_string(),
            interval,
            generated_at: Utc::now(),
            candles,
            metrics,
            indicators,
        }
    }
}

/// Keep exactly the selected intervals, each cut to the most recent rows.
fn trim_candles(mut fetched: IntervalSeries, intervals: &[Interval]) -> IntervalSeries {
    intervals
        .iter()
        .map(|&interval| {
            let mut rows = fetched.remove(&interval).unwrap_or_default();
            rows.truncate(CANDLES_PER_INTERVAL);
            (interval, rows)
        })
        .collect()
}

/// Allow-listed tables only; row lists filtered to `interval` and capped,
/// error descriptors passed through.
pub fn select_indicators(
    scan: IndicatorScan,
    interval: Interval,
) -> BTreeMap<String, IndicatorTable> {
    let mut tables = match scan {
        IndicatorScan::Tables(tables) => tables,
        IndicatorScan::Unavailable { .. } => return BTreeMap::new(),
    };

    INDICATOR_ALLOW_LIST
        .iter()
        .filter_map(|&name| {
            let table = match tables.remove(name)? {
                IndicatorTable::Rows(rows) => IndicatorTable::Rows(
                    rows.into_iter()
                        .filter(|row| row_period(row) == Some(interval.as_str()))
                        .take(INDICATOR_ROWS_PER_TABLE)
                        .collect(),
                ),
                error => error,
            };
            Some((name.to_string(), table))
        })
        .collect()
}
