use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Invalid alarm: {0}")]
    InvalidAlarm(String),
    #[error("Alarm not found: {0}")]
    NotFound(String),
    #[error("Exact scheduling permission not granted")]
    PermissionDenied,
    #[error("Trigger backend call failed: {0}")]
    Backend(String),
}
