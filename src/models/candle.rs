use rust_decimal::Decimal;
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Rows fetched per interval before trimming.
pub const CANDLE_FETCH_LIMIT: u32 = 50;

/// Candle bucket durations stored in TimescaleDB (`candles_<label>` tables).
///
/// Serializes as its label, including when used as a map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    M1,
    M5,
    M15,
    H1,
    H4,
    D1,
    W1,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown interval '{0}' (expected one of 1m, 5m, 15m, 1h, 4h, 1d, 1w)")]
pub struct IntervalParseError(pub String);

impl Interval {
    pub const ALL: [Interval; 7] = [
        Interval::M1,
        Interval::M5,
        Interval::M15,
        Interval::H1,
        Interval::H4,
        Interval::D1,
        Interval::W1,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::H1 => "1h",
            Interval::H4 => "4h",
            Interval::D1 => "1d",
            Interval::W1 => "1w",
        }
    }

    /// Intervals fetched when `self` is requested: itself plus the next longer
    /// one. `1m` and `1w` map to themselves only.
    pub fn with_neighbor(self) -> &'static [Interval] {
        match self {
            Interval::M1 => &[Interval::M1],
            Interval::M5 => &[Interval::M5, Interval::M15],
            Interval::M15 => &[Interval::M15, Interval::H1],
            Interval::H1 => &[Interval::H1, Interval::H4],
            Interval::H4 => &[Interval::H4, Interval::D1],
            Interval::D1 => &[Interval::D1, Interval::W1],
            Interval::W1 => &[Interval::W1],
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = IntervalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .into_iter()
            .find(|iv| iv.as_str() == s.trim())
            .ok_or_else(|| IntervalParseError(s.to_string()))
    }
}

impl TryFrom<String> for Interval {
    type Error = IntervalParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(interval: Interval) -> Self {
        interval.as_str().to_string()
    }
}

/// One OHLCV bucket, as returned by either the driver or `psql`.
///
/// Every field is nullable: a SQL NULL stays `None` and is never coerced to
/// zero. `bucket_ts` is the store's own text rendering of the timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromQueryResult)]
pub struct Candle {
    pub bucket_ts: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub open: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub high: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub low: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub close: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub volume: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub quote_volume: Option<Decimal>,
    pub trade_count: Option<i64>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub taker_buy_volume: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub taker_buy_quote_volume: Option<Decimal>,
}

/// Candles per interval, most recent first.
pub type IntervalSeries = BTreeMap<Interval, Vec<Candle>>;
