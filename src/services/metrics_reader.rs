use async_trait::async_trait;
use sea_orm::{DatabaseBackend, FromQueryResult, Statement};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::MarketDataConfig;
use crate::error::ReaderError;
use crate::models::metrics::METRICS_FETCH_LIMIT;
use crate::models::FuturesMetric;
use crate::services::timescale_reader::{connect, disconnect};

/// Best-effort source of futures metrics.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Most recent samples first. Empty on any failure.
    async fn read_metrics(&self, symbol: &str) -> Vec<FuturesMetric>;
}

pub fn metrics_sql(table: &str) -> String {
    format!(
        "SELECT m.create_time::text AS create_time, m.symbol::text AS symbol, \
         m.sum_open_interest::text AS sum_open_interest, \
         m.sum_open_interest_value::text AS sum_open_interest_value, \
         m.sum_toptrader_long_short_ratio::text AS sum_toptrader_long_short_ratio, \
         m.sum_taker_long_short_vol_ratio::text AS sum_taker_long_short_vol_ratio \
         FROM {table} AS m \
         WHERE m.symbol = $1 \
         ORDER BY m.create_time DESC \
         LIMIT {METRICS_FETCH_LIMIT}"
    )
}

pub struct MetricsReader {
    config: Arc<MarketDataConfig>,
}

impl MetricsReader {
    pub fn new(config: Arc<MarketDataConfig>) -> Self {
        Self { config }
    }

    async fn try_read(&self, symbol: &str) -> Result<Vec<FuturesMetric>, ReaderError> {
        let db = connect(&self.config).await?;
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            metrics_sql(&self.config.metrics_table_name()),
            [symbol.into()],
        );
        let result = FuturesMetric::find_by_statement(stmt).all(&db).await;
        disconnect(db).await;
        Ok(result?)
    }
}

#[async_trait]
impl MetricsSource for MetricsReader {
    async fn read_metrics(&self, symbol: &str) -> Vec<FuturesMetric> {
        let limit = self.config.query_timeout;
        let result = match tokio::time::timeout(limit, self.try_read(symbol)).await {
            Ok(result) => result,
            Err(_) => Err(ReaderError::Timeout {
                secs: limit.as_secs(),
            }),
        };

        match result {
            Ok(metrics) => {
                debug!(symbol = %symbol, rows = metrics.len(), "Fetched futures metrics");
                metrics
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Futures metrics unavailable");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_metrics_sql_keeps_numeric_as_text() {
        let sql = metrics_sql("market_data.binance_futures_metrics_5m");
        assert!(sql.contains("FROM market_data.binance_futures_metrics_5m AS m"));
        assert!(sql.contains("m.sum_open_interest::text AS sum_open_interest"));
        assert!(sql.contains("ORDER BY m.create_time DESC"));
        assert!(sql.ends_with("LIMIT 50"));
    }

    #[tokio::test]
    async fn test_unreachable_store_yields_empty() {
        let config = MarketDataConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            query_timeout: Duration::from_secs(1),
            ..MarketDataConfig::default()
        };
        let reader = MetricsReader::new(Arc::new(config));

        assert!(reader.read_metrics("BTCUSDT").await.is_empty());
    }
}
