use std::path::PathBuf;

use thiserror::Error;

/// Failure of the primary (driver-based) time-series reader.
///
/// Never reaches the payload caller: it only decides whether the `psql`
/// fallback runs.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("time-series query timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Failure while opening or scanning the indicator store.
#[derive(Debug, Error)]
pub enum IndicatorError {
    #[error("indicator database not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("indicator scan task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Prompt template errors. These are the only errors surfaced to callers.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt template not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("invalid prompt name: {0:?}")]
    InvalidName(String),

    #[error("failed to read prompt template: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize payload: {0}")]
    Json(#[from] serde_json::Error),
}
