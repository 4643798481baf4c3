use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup not found: {0}")]
    NotFound(String),
    #[error("invalid archive {path}: {reason}")]
    InvalidArchive { path: String, reason: String },
    #[error("cannot restore {table}.{column}: {reason}")]
    InvalidValue { table: String, column: String, reason: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("database error: {0}")]
    Db(String),
    #[error("background task failed: {0}")]
    Task(String),
}

impl BackupError {
    pub fn invalid_archive(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::InvalidArchive { path: path.display().to_string(), reason: reason.into() }
    }
}

impl From<sea_orm::DbErr> for BackupError {
    fn from(e: sea_orm::DbErr) -> Self { Self::Db(e.to_string()) }
}

impl From<tokio::task::JoinError> for BackupError {
    fn from(e: tokio::task::JoinError) -> Self { Self::Task(e.to_string()) }
}
