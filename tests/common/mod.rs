use async_trait::async_trait;
use rusqlite::Connection;
use std::path::PathBuf;

use market_snapshot::services::metrics_reader::MetricsSource;
use market_snapshot::FuturesMetric;

/// Scanner store with the tables the payload cares about plus some noise.
/// Keep the `TempDir` alive for as long as the path is used.
#[allow(dead_code)]
pub fn indicator_fixture() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("market_data.db");
    let conn = Connection::open(&path).expect("open fixture store");
    conn.execute_batch(
        r#"
        CREATE TABLE "MACD柱状扫描器.py" ("交易对" TEXT, "周期" TEXT, "MACD柱" REAL, "信号" TEXT);
        INSERT INTO "MACD柱状扫描器.py" VALUES ('BTCUSDT', '5m', 12.5, '金叉');
        INSERT INTO "MACD柱状扫描器.py" VALUES ('BTCUSDT', '1h', -3.0, '死叉');
        INSERT INTO "MACD柱状扫描器.py" VALUES ('ETHUSDT', '5m', 1.0, '金叉');

        CREATE TABLE "ATR波幅扫描器.py" ("交易对" TEXT, "周期" TEXT, "ATR" REAL);
        INSERT INTO "ATR波幅扫描器.py" VALUES ('BTCUSDT', '5m', 1.1);
        INSERT INTO "ATR波幅扫描器.py" VALUES ('BTCUSDT', '5m', 1.2);
        INSERT INTO "ATR波幅扫描器.py" VALUES ('BTCUSDT', '5m', 1.3);
        INSERT INTO "ATR波幅扫描器.py" VALUES ('BTCUSDT', '5m', 1.4);
        INSERT INTO "ATR波幅扫描器.py" VALUES ('BTCUSDT', '5m', 1.5);
        INSERT INTO "ATR波幅扫描器.py" VALUES ('BTCUSDT', '5m', 1.6);
        INSERT INTO "ATR波幅扫描器.py" VALUES ('BTCUSDT', '5m', 1.7);

        CREATE TABLE "布林带扫描器.py" ("交易对" TEXT, "周期" TEXT, "带宽" REAL);
        INSERT INTO "布林带扫描器.py" VALUES ('BTCUSDT', '4h', 0.02);

        CREATE TABLE "支撑阻力扫描器.py" ("交易对" TEXT, "周期" TEXT, "支撑" REAL);
        INSERT INTO "支撑阻力扫描器.py" VALUES ('BTCUSDT', '5m', 60000.0);
        "#,
    )
    .expect("seed fixture store");
    (dir, path)
}

#[allow(dead_code)]
pub fn metric(symbol: &str, create_time: &str) -> FuturesMetric {
    FuturesMetric {
        create_time: Some(create_time.to_string()),
        symbol: Some(symbol.to_string()),
        sum_open_interest: Some("81234.567".to_string()),
        sum_open_interest_value: Some("5500000000.12345678".to_string()),
        sum_toptrader_long_short_ratio: Some("1.2345".to_string()),
        sum_taker_long_short_vol_ratio: Some("0.9876".to_string()),
    }
}

/// `n` samples, newest first.
#[allow(dead_code)]
pub struct StaticMetrics(pub usize);

#[async_trait]
impl MetricsSource for StaticMetrics {
    async fn read_metrics(&self, symbol: &str) -> Vec<FuturesMetric> {
        (0..self.0)
            .map(|i| metric(symbol, &format!("2024-01-01 {:02}:00:00", 23 - (i % 24))))
            .collect()
    }
}

#[cfg(unix)]
#[allow(dead_code)]
pub fn write_executable(path: &std::path::Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, body).expect("write script");
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).expect("chmod script");
}
