use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

/// Rows fetched from the futures metrics table before trimming.
pub const METRICS_FETCH_LIMIT: u32 = 50;

/// One 5-minute futures metrics sample.
///
/// The four ratio/interest columns are `numeric` in the store and are carried
/// as the store's own text rendering so no precision is lost on the way to
/// JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromQueryResult)]
pub struct FuturesMetric {
    pub create_time: Option<String>,
    pub symbol: Option<String>,
    pub sum_open_interest: Option<String>,
    pub sum_open_interest_value: Option<String>,
    pub sum_toptrader_long_short_ratio: Option<String>,
    pub sum_taker_long_short_vol_ratio: Option<String>,
}
