// src/lib.rs

pub mod config;
pub mod error;
pub mod models;

pub mod services {
    pub mod analysis;
    pub mod candle_reader;
    pub mod indicator_store;
    pub mod metrics_reader;
    pub mod payload_builder;
    pub mod prompt_builder;
    pub mod psql_reader;
    pub mod timescale_reader;
}

pub use config::MarketDataConfig;
pub use models::{Candle, FuturesMetric, IndicatorScan, IndicatorTable, Interval, IntervalSeries, Payload};
pub use services::analysis::{prepare_analysis, AnalysisRequest};
pub use services::payload_builder::PayloadBuilder;
pub use services::prompt_builder::PromptRegistry;
