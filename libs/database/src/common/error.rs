/// Unified error type for connector and health-check operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Driver-level errors (SeaORM / sqlx over the MySQL protocol)
    #[cfg(feature = "oceanbase")]
    #[error("OceanBase error: {0}")]
    OceanBase(#[from] sea_orm::DbErr),

    /// Connection or authentication handshake failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Health check failed
    #[error("Health check failed: {0}")]
    HealthCheckFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;
