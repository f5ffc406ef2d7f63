use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::{info, warn};

use super::OceanBaseConfig;
use crate::common::{DatabaseError, RetryConfig, retry_with_backoff};

/// Open a pooled connection to OceanBase and verify the handshake with a ping.
///
/// Authentication failures surface here rather than on first use.
///
/// ```ignore
/// use database::oceanbase::{connect, OceanBaseConfig};
///
/// let db = connect(&OceanBaseConfig::new("localhost", 2881, "root@test", "", "test")).await?;
/// ```
pub async fn connect(config: &OceanBaseConfig) -> Result<DatabaseConnection, DatabaseError> {
    let target = config.redacted_url();
    let db = connect_with_options(config.clone().into_connect_options())
        .await
        .map_err(|e| {
            warn!(target = %target, error = %e, "OceanBase connection failed");
            e
        })?;

    info!(target = %target, "Connected to OceanBase");
    Ok(db)
}

/// Connect with caller-built pool options
pub async fn connect_with_options(
    options: ConnectOptions,
) -> Result<DatabaseConnection, DatabaseError> {
    let db = Database::connect(options)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    db.ping()
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(format!("handshake failed: {}", e)))?;

    Ok(db)
}

/// Connect with exponential backoff
///
/// Meant for process startup, where the database container may still be booting.
/// Request paths should use [`connect`] and let the caller decide.
pub async fn connect_with_retry(
    config: &OceanBaseConfig,
    retry_config: Option<RetryConfig>,
) -> Result<DatabaseConnection, DatabaseError> {
    retry_with_backoff(|| connect(config), retry_config.unwrap_or_default()).await
}
