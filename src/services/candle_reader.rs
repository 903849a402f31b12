use async_trait::async_trait;
use tracing::warn;

use crate::error::ReaderError;
use crate::models::{Interval, IntervalSeries};
use crate::services::psql_reader::CliReader;
use crate::services::timescale_reader::NetworkReader;

/// Source of candles for a batch of intervals.
#[async_trait]
pub trait CandleReader: Send + Sync {
    /// Read the most recent candles of `symbol` for every interval in
    /// `intervals`, newest first.
    async fn read_candles(
        &self,
        symbol: &str,
        intervals: &[Interval],
    ) -> Result<IntervalSeries, ReaderError>;
}

/// Tries `primary` and, if the batch fails for any reason, answers the same
/// request from `fallback`. There is exactly one substitution, no retries.
pub struct FallbackReader<P, F> {
    primary: P,
    fallback: F,
}

/// Driver first, `psql` second.
pub type DefaultCandleReader = FallbackReader<NetworkReader, CliReader>;

impl<P, F> FallbackReader<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl<P, F> CandleReader for FallbackReader<P, F>
where
    P: CandleReader,
    F: CandleReader,
{
    async fn read_candles(
        &self,
        symbol: &str,
        intervals: &[Interval],
    ) -> Result<IntervalSeries, ReaderError> {
        match self.primary.read_candles(symbol, intervals).await {
            Ok(series) => Ok(series),
            Err(e) => {
                warn!(
                    symbol = %symbol,
                    error = %e,
                    "Primary candle reader failed, falling back to psql"
                );
                self.fallback.read_candles(symbol, intervals).await
            }
        }
    }
}
