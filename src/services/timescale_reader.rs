//! Driver-based reader for the TimescaleDB candle tables.
//!
//! Opens one connection per call and closes it before returning; nothing is
//! pooled across requests.

use async_trait::async_trait;
use sea_orm::{
    ConnectOptions, Database, DatabaseBackend, DatabaseConnection, DbErr, FromQueryResult,
    Statement,
};
use std::sync::Arc;
use tracing::debug;

use crate::config::MarketDataConfig;
use crate::error::ReaderError;
use crate::models::candle::CANDLE_FETCH_LIMIT;
use crate::models::{Candle, Interval, IntervalSeries};
use crate::services::candle_reader::CandleReader;

/// Candle query shared by the driver and the `psql` fallback.
///
/// Casts pin the wire types: text timestamps, `numeric` prices and volumes,
/// `bigint` trade counts. `symbol_expr` is `$1` for the driver and a quoted
/// literal for `psql`.
pub fn candles_sql(table: &str, symbol_expr: &str) -> String {
    format!(
        "SELECT c.bucket_ts::text AS bucket_ts, \
         c.open::numeric AS open, c.high::numeric AS high, \
         c.low::numeric AS low, c.close::numeric AS close, \
         c.volume::numeric AS volume, c.quote_volume::numeric AS quote_volume, \
         c.trade_count::bigint AS trade_count, \
         c.taker_buy_volume::numeric AS taker_buy_volume, \
         c.taker_buy_quote_volume::numeric AS taker_buy_quote_volume \
         FROM {table} AS c \
         WHERE c.symbol = {symbol_expr} \
         ORDER BY c.bucket_ts DESC \
         LIMIT {CANDLE_FETCH_LIMIT}"
    )
}

/// Open a single-connection handle to the time-series store.
///
/// No pool-level timeouts: callers wrap the whole call in `query_timeout`,
/// so a stalled server surfaces as `ReaderError::Timeout`.
pub(crate) async fn connect(config: &MarketDataConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opts = ConnectOptions::new(config.database_url());
    opts.max_connections(1)
        .min_connections(0)
        .sqlx_logging(false);

    Database::connect(opts).await
}

/// Close a per-call connection. A failed close only matters for logs.
pub(crate) async fn disconnect(db: DatabaseConnection) {
    if let Err(e) = db.close().await {
        debug!(error = %e, "Failed to close time-series connection");
    }
}

pub struct NetworkReader {
    config: Arc<MarketDataConfig>,
}

impl NetworkReader {
    pub fn new(config: Arc<MarketDataConfig>) -> Self {
        Self { config }
    }

    async fn read_batch(
        &self,
        symbol: &str,
        intervals: &[Interval],
    ) -> Result<IntervalSeries, ReaderError> {
        let db = connect(&self.config).await?;
        let result = self.query_intervals(&db, symbol, intervals).await;
        disconnect(db).await;
        result
    }

    /// Any failing interval fails the whole batch.
    async fn query_intervals(
        &self,
        db: &DatabaseConnection,
        symbol: &str,
        intervals: &[Interval],
    ) -> Result<IntervalSeries, ReaderError> {
        let mut series = IntervalSeries::new();

        for &interval in intervals {
            let table = self.config.candles_table(interval);
            let stmt = Statement::from_sql_and_values(
                DatabaseBackend::Postgres,
                candles_sql(&table, "$1"),
                [symbol.into()],
            );
            let candles = Candle::find_by_statement(stmt).all(db).await?;

            debug!(
                symbol = %symbol,
                interval = %interval,
                rows = candles.len(),
                "Fetched candles from TimescaleDB"
            );
            series.insert(interval, candles);
        }

        Ok(series)
    }
}

#[async_trait]
impl CandleReader for NetworkReader {
    async fn read_candles(
        &self,
        symbol: &str,
        intervals: &[Interval],
    ) -> Result<IntervalSeries, ReaderError> {
        let limit = self.config.query_timeout;
        match tokio::time::timeout(limit, self.read_batch(symbol, intervals)).await {
            Ok(result) => result,
            Err(_) => Err(ReaderError::Timeout {
                secs: limit.as_secs(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::candle_reader::FallbackReader;
    use std::time::Duration;

    #[test]
    fn test_candles_sql_shape() {
        let sql = candles_sql("market_data.candles_5m", "$1");
        assert!(sql.contains("FROM market_data.candles_5m AS c"));
        assert!(sql.contains("WHERE c.symbol = $1"));
        assert!(sql.contains("ORDER BY c.bucket_ts DESC"));
        assert!(sql.ends_with("LIMIT 50"));
        assert!(sql.contains("c.trade_count::bigint AS trade_count"));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_an_error() {
        let config = MarketDataConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            query_timeout: Duration::from_secs(1),
            ..MarketDataConfig::default()
        };
        let reader = NetworkReader::new(Arc::new(config));

        let result = reader.read_candles("BTCUSDT", &[Interval::M5]).await;
        assert!(result.is_err());
    }

    struct Fixed;

    #[async_trait]
    impl CandleReader for Fixed {
        async fn read_candles(
            &self,
            _: &str,
            intervals: &[Interval],
        ) -> Result<IntervalSeries, ReaderError> {
            Ok(intervals.iter().map(|&iv| (iv, Vec::new())).collect())
        }
    }

    /// Accepts connections and never answers the startup handshake.
    async fn silent_server() -> (u16, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        (port, handle)
    }

    #[tokio::test]
    async fn test_stalled_store_times_out_and_falls_back() {
        let (port, server) = silent_server().await;
        let config = Arc::new(MarketDataConfig {
            host: "127.0.0.1".to_string(),
            port,
            query_timeout: Duration::from_secs(1),
            ..MarketDataConfig::default()
        });

        let started = std::time::Instant::now();
        match NetworkReader::new(config.clone())
            .read_candles("BTCUSDT", &[Interval::H1])
            .await
        {
            Err(ReaderError::Timeout { secs }) => assert_eq!(secs, 1),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(10));

        let reader = FallbackReader::new(NetworkReader::new(config), Fixed);
        let series = reader
            .read_candles("BTCUSDT", &[Interval::H1, Interval::H4])
            .await
            .unwrap();
        assert_eq!(
            series.keys().copied().collect::<Vec<_>>(),
            vec![Interval::H1, Interval::H4]
        );

        server.abort();
    }
}
