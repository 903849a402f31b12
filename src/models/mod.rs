pub mod candle;
pub mod indicator;
pub mod metrics;
pub mod payload;

pub use candle::{Candle, Interval, IntervalParseError, IntervalSeries};
pub use indicator::{IndicatorRow, IndicatorScan, IndicatorTable};
pub use metrics::FuturesMetric;
pub use payload::Payload;
