use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("episode not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("lock timeout after retries: {0}")]
    LockTimeout(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

impl RegistryError {
    /// `SQLITE_BUSY` (5) and `SQLITE_LOCKED` (6) are the only conditions the
    /// exponential backoff in `retry::with_retry` should retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            RegistryError::Database(sqlx::Error::Database(db_err)) => {
                matches!(db_err.code().as_deref(), Some("5") | Some("6"))
            }
            _ => false,
        }
    }
}
