use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{FuturesMetric, IndicatorTable, Interval, IntervalSeries};

/// Bounded market snapshot for one (symbol, interval) request, handed to the
/// prompt builder as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub symbol: String,
    pub interval: Interval,
    pub generated_at: DateTime<Utc>,
    pub candles: IntervalSeries,
    pub metrics: Vec<FuturesMetric>,
    pub indicators: BTreeMap<String, IndicatorTable>,
}
