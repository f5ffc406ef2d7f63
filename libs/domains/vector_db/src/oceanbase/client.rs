use std::ops::Deref;

use core_config::vector_db::VectorDbSelection;
use database::oceanbase::{check_health, connect, DatabaseConnection, OceanBaseConfig};
use tracing::{debug, warn};

use crate::error::{VectorDbError, VectorDbResult};

/// Backend identifier matched against `VECTOR_DB`
pub const BACKEND_NAME: &str = "oceanbase";

/// Connection manager for the OceanBase store.
///
/// Holds either a caller-supplied shared connection or the settings to open
/// one per operation.
#[derive(Clone)]
pub struct OceanBaseClient {
    config: OceanBaseConfig,
    selection: VectorDbSelection,
    shared: Option<DatabaseConnection>,
}

/// A connection borrowed from the client for the duration of one operation.
///
/// Owned connections are closed when the scope is dropped.
pub enum ConnectionScope<'a> {
    Shared(&'a DatabaseConnection),
    Owned(DatabaseConnection),
}

impl Deref for ConnectionScope<'_> {
    type Target = DatabaseConnection;

    fn deref(&self) -> &Self::Target {
        match self {
            ConnectionScope::Shared(conn) => conn,
            ConnectionScope::Owned(conn) => conn,
        }
    }
}

impl OceanBaseClient {
    pub fn new(config: OceanBaseConfig, selection: VectorDbSelection) -> Self {
        Self {
            config,
            selection,
            shared: None,
        }
    }

    /// Reuse `conn` for every operation instead of opening one per call
    pub fn with_connection(mut self, conn: DatabaseConnection) -> Self {
        self.shared = Some(conn);
        self
    }

    pub fn config(&self) -> &OceanBaseConfig {
        &self.config
    }

    fn ensure_selected(&self) -> VectorDbResult<()> {
        if self.selection.is(BACKEND_NAME) {
            Ok(())
        } else {
            Err(VectorDbError::Configuration(format!(
                "VECTOR_DB is '{}', expected '{}'",
                self.selection.backend, BACKEND_NAME
            )))
        }
    }

    /// Open a new connection, failing fast on a backend mismatch
    pub async fn connect(&self) -> VectorDbResult<DatabaseConnection> {
        self.ensure_selected()?;
        Ok(connect(&self.config).await?)
    }

    /// Connection for one operation: the shared handle if any, else a fresh one
    pub async fn scope(&self) -> VectorDbResult<ConnectionScope<'_>> {
        self.ensure_selected()?;
        match &self.shared {
            Some(conn) => Ok(ConnectionScope::Shared(conn)),
            None => {
                debug!(target_db = %self.config.redacted_url(), "Opening scoped connection");
                Ok(ConnectionScope::Owned(connect(&self.config).await?))
            }
        }
    }

    /// Liveness timestamp in epoch millis after a successful round-trip
    pub async fn heartbeat(&self) -> VectorDbResult<i64> {
        match &self.shared {
            Some(conn) => {
                self.ensure_selected()?;
                check_health(conn).await?;
            }
            None => {
                let conn = self.connect().await?;
                if let Err(e) = conn.close().await {
                    warn!(error = %e, "Failed to close heartbeat connection");
                }
            }
        }
        Ok(chrono::Utc::now().timestamp_millis())
    }
}
