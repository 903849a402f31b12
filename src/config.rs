use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::Interval;

/// Market data source configuration derived from environment variables.
///
/// Variable names match the ones the ai-service deployment already exports
/// (`TIMESCALE_*`, `INDICATOR_DB`), so the same `.env` file works unchanged.
/// Built once at startup and handed to each reader behind an `Arc`.
#[derive(Clone)]
pub struct MarketDataConfig {
    // ── TimescaleDB ────────────────────────────────────────────────
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Schema holding `candles_<interval>` and the metrics table.
    pub schema: String,
    pub metrics_table: String,

    // ── Local files ────────────────────────────────────────────────
    pub indicator_db: PathBuf,
    pub psql_bin: PathBuf,
    pub prompt_dir: PathBuf,

    // ── Timeouts ───────────────────────────────────────────────────
    /// Bounds connect plus every query of one primary batch.
    pub query_timeout: Duration,
    /// Bounds a single `psql` child process.
    pub cli_timeout: Duration,
}

const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CLI_TIMEOUT_SECS: u64 = 15;

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl MarketDataConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the config from an arbitrary variable source. Empty or
    /// unparsable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let str_or = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());
        let secs_or = |name: &str, default: u64| {
            Duration::from_secs(get(name).and_then(|s| s.parse().ok()).unwrap_or(default))
        };

        Self {
            host: str_or("TIMESCALE_HOST", "localhost"),
            port: get("TIMESCALE_PORT").and_then(|s| s.parse().ok()).unwrap_or(5433),
            user: str_or("TIMESCALE_USER", "postgres"),
            password: str_or("TIMESCALE_PASSWORD", "postgres"),
            database: str_or("TIMESCALE_DB", "market_data"),
            schema: str_or("TIMESCALE_SCHEMA", "market_data"),
            metrics_table: str_or("FUTURES_METRICS_TABLE", "binance_futures_metrics_5m"),
            indicator_db: PathBuf::from(str_or("INDICATOR_DB", "data/market_data.db")),
            psql_bin: PathBuf::from(str_or("PSQL_BIN", "psql")),
            prompt_dir: PathBuf::from(str_or("PROMPT_DIR", "prompts")),
            query_timeout: secs_or("TIMESCALE_QUERY_TIMEOUT_SECS", DEFAULT_QUERY_TIMEOUT_SECS),
            cli_timeout: secs_or("PSQL_TIMEOUT_SECS", DEFAULT_CLI_TIMEOUT_SECS),
        }
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            urlencoding::encode(&self.user),
            urlencoding::encode(&self.password),
            self.host,
            self.port,
            urlencoding::encode(&self.database)
        )
    }

    pub fn candles_table(&self, interval: Interval) -> String {
        format!("{}.candles_{}", self.schema, interval)
    }

    pub fn metrics_table_name(&self) -> String {
        format!("{}.{}", self.schema, self.metrics_table)
    }
}

impl fmt::Debug for MarketDataConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketDataConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("metrics_table", &self.metrics_table)
            .field("indicator_db", &self.indicator_db)
            .field("psql_bin", &self.psql_bin)
            .field("prompt_dir", &self.prompt_dir)
            .field("query_timeout", &self.query_timeout)
            .field("cli_timeout", &self.cli_timeout)
            .finish()
    }
}
