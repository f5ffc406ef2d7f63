use database::DatabaseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorDbError {
    /// The deployment is not configured for this backend
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Authentication or handshake with the store failed
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Dimension mismatch at record {index}: expected {expected}, got {actual}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Namespace not found: {0}")]
    NamespaceNotFound(String),

    /// A transactional batch write was rolled back at this record
    #[error("Upsert failed at record {index}: {reason}")]
    UpsertFailed { index: usize, reason: String },

    /// The store reported a condition that may clear on retry
    #[error("Transient store error: {0}")]
    Transient(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Vector cache error: {0}")]
    Cache(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type VectorDbResult<T> = Result<T, VectorDbError>;

impl VectorDbError {
    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VectorDbError::Transient(_))
    }

    /// Errors that must reach the caller even from paths that otherwise
    /// report failures as data (per-document ingestion).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VectorDbError::Configuration(_) | VectorDbError::Connection(_) | VectorDbError::Cancelled
        )
    }
}

/// MySQL error 1146 (`ER_NO_SUCH_TABLE`), raised when a namespace is dropped mid-query
fn is_missing_table(message: &str) -> bool {
    message.contains("1146") || message.contains("doesn't exist")
}

impl From<sea_orm::DbErr> for VectorDbError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::Conn(e) => VectorDbError::Connection(e.to_string()),
            sea_orm::DbErr::ConnectionAcquire(e) => VectorDbError::Connection(e.to_string()),
            other => {
                let message = other.to_string();
                if is_missing_table(&message) {
                    VectorDbError::Transient(message)
                } else {
                    VectorDbError::Database(message)
                }
            }
        }
    }
}

impl From<DatabaseError> for VectorDbError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConnectionFailed(msg) => VectorDbError::Connection(msg),
            DatabaseError::ConfigError(msg) => VectorDbError::Configuration(msg),
            DatabaseError::HealthCheckFailed(msg) => VectorDbError::Connection(msg),
            DatabaseError::OceanBase(e) => e.into(),
        }
    }
}

impl From<core_config::ConfigError> for VectorDbError {
    fn from(err: core_config::ConfigError) -> Self {
        VectorDbError::Configuration(err.to_string())
    }
}

impl From<reqwest::Error> for VectorDbError {
    fn from(err: reqwest::Error) -> Self {
        VectorDbError::Embedding(err.to_string())
    }
}

impl From<serde_json::Error> for VectorDbError {
    fn from(err: serde_json::Error) -> Self {
        VectorDbError::Internal(format!("JSON error: {}", err))
    }
}
