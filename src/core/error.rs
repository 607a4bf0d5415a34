use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Resolution error: {0}")]
    ResolutionError(String),

    #[error("Coercion error: {0}")]
    CoercionError(String),

    #[error("Statement error: {0}")]
    StatementError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl DbError {
    /// Errors detected before any SQL reaches the storage engine.
    pub fn is_pre_storage(&self) -> bool {
        matches!(self, Self::ResolutionError(_) | Self::StatementError(_))
    }
}

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        Self::CoercionError(err.to_string())
    }
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}
