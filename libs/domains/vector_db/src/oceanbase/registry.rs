use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseBackend, FromQueryResult, Statement};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::sql::{namespace_of, parse_vector_dimension, prefix_pattern, quote_ident, table_name};
use crate::error::{VectorDbError, VectorDbResult};
use crate::models::{DropOutcome, NamespaceDescriptor, NamespaceStats};

#[derive(Debug, FromQueryResult)]
struct TableRow {
    table_name: String,
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    count: i64,
}

#[derive(Debug, FromQueryResult)]
struct CatalogRow {
    table_name: String,
    created_at: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct ColumnTypeRow {
    column_type: String,
}

/// Namespace catalog backed by `information_schema`.
///
/// Also owns the in-process state shared by writers: one schema lock per
/// namespace and the dimensions already read from the catalog.
pub struct NamespaceRegistry {
    prefix: String,
    schema_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    dimensions: RwLock<HashMap<String, usize>>,
}

impl NamespaceRegistry {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            schema_locks: Mutex::new(HashMap::new()),
            dimensions: RwLock::new(HashMap::new()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn table_for(&self, namespace: &str) -> VectorDbResult<String> {
        table_name(&self.prefix, namespace)
    }

    /// Serializes schema changes for one namespace within this process
    pub async fn schema_lock(&self, namespace: &str) -> Arc<Mutex<()>> {
        let mut locks = self.schema_locks.lock().await;
        locks
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry of a namespace unless another task still holds a handle to it.
    /// Callers keep their own handle, so two strong references means nobody else is waiting.
    async fn release_schema_lock(&self, namespace: &str) {
        let mut locks = self.schema_locks.lock().await;
        if locks
            .get(namespace)
            .is_some_and(|lock| Arc::strong_count(lock) <= 2)
        {
            locks.remove(namespace);
        }
    }

    pub async fn cached_dimension(&self, namespace: &str) -> Option<usize> {
        self.dimensions.read().await.get(namespace).copied()
    }

    pub async fn remember_dimension(&self, namespace: &str, dimension: usize) {
        self.dimensions
            .write()
            .await
            .insert(namespace.to_string(), dimension);
    }

    pub async fn forget(&self, namespace: &str) {
        self.dimensions.write().await.remove(namespace);
    }

    pub async fn list<C: ConnectionTrait>(&self, conn: &C) -> VectorDbResult<Vec<NamespaceDescriptor>> {
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::MySql,
            "SELECT table_name AS table_name FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_name LIKE ? ORDER BY table_name",
            [prefix_pattern(&self.prefix).into()],
        );

        let rows = TableRow::find_by_statement(stmt).all(conn).await?;
        let namespaces: Vec<NamespaceDescriptor> = rows
            .into_iter()
            .filter_map(|row| {
                namespace_of(&self.prefix, &row.table_name).map(|name| NamespaceDescriptor {
                    name: name.to_string(),
                    table_name: row.table_name.clone(),
                })
            })
            .collect();

        debug!(count = namespaces.len(), "Listed namespaces");
        Ok(namespaces)
    }

    pub async fn exists<C: ConnectionTrait>(&self, conn: &C, namespace: &str) -> VectorDbResult<bool> {
        let table = self.table_for(namespace)?;
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::MySql,
            "SELECT COUNT(*) AS count FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_name = ?",
            [table.into()],
        );

        let row = CountRow::find_by_statement(stmt).one(conn).await?;
        Ok(row.is_some_and(|r| r.count > 0))
    }

    pub async fn row_count<C: ConnectionTrait>(&self, conn: &C, table: &str) -> VectorDbResult<u64> {
        let stmt = Statement::from_string(
            DatabaseBackend::MySql,
            format!("SELECT COUNT(*) AS count FROM {}", quote_ident(table)),
        );

        let row = CountRow::find_by_statement(stmt).one(conn).await?;
        Ok(row.map_or(0, |r| r.count.max(0) as u64))
    }

    /// Dimension of the `embedding` column as declared in the catalog
    pub async fn column_dimension<C: ConnectionTrait>(
        &self,
        conn: &C,
        table: &str,
    ) -> VectorDbResult<Option<usize>> {
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::MySql,
            "SELECT column_type AS column_type FROM information_schema.columns \
             WHERE table_schema = DATABASE() AND table_name = ? AND column_name = 'embedding'",
            [table.into()],
        );

        let row = ColumnTypeRow::find_by_statement(stmt).one(conn).await?;
        Ok(row.and_then(|r| {
            let dimension = parse_vector_dimension(&r.column_type);
            if dimension.is_none() {
                warn!(table, column_type = %r.column_type, "Unrecognized embedding column type");
            }
            dimension
        }))
    }

    /// Established dimension of a namespace, `None` if it has no table yet
    pub async fn dimension<C: ConnectionTrait>(
        &self,
        conn: &C,
        namespace: &str,
    ) -> VectorDbResult<Option<usize>> {
        if let Some(dimension) = self.cached_dimension(namespace).await {
            return Ok(Some(dimension));
        }

        let table = self.table_for(namespace)?;
        let dimension = self.column_dimension(conn, &table).await?;
        if let Some(dimension) = dimension {
            self.remember_dimension(namespace, dimension).await;
        }
        Ok(dimension)
    }

    pub async fn stats<C: ConnectionTrait>(
        &self,
        conn: &C,
        namespace: &str,
    ) -> VectorDbResult<Option<NamespaceStats>> {
        let table = self.table_for(namespace)?;
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::MySql,
            "SELECT table_name AS table_name, CAST(create_time AS CHAR) AS created_at \
             FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ?",
            [table.clone().into()],
        );

        let Some(catalog) = CatalogRow::find_by_statement(stmt).one(conn).await? else {
            return Ok(None);
        };

        let dimension = self.column_dimension(conn, &table).await?;
        let row_count = self.row_count(conn, &table).await?;

        Ok(Some(NamespaceStats {
            name: namespace.to_string(),
            table_name: catalog.table_name,
            dimension,
            row_count,
            created_at: catalog.created_at,
        }))
    }

    /// Drop the namespace table, telling absence apart from failure
    pub async fn drop_namespace<C: ConnectionTrait>(&self, conn: &C, namespace: &str) -> VectorDbResult<DropOutcome> {
        let table = self.table_for(namespace)?;
        let lock = self.schema_lock(namespace).await;
        let _guard = lock.lock().await;

        if !self.exists(conn, namespace).await? {
            self.forget(namespace).await;
            self.release_schema_lock(namespace).await;
            debug!(namespace, "Namespace already absent");
            return Ok(DropOutcome::AlreadyAbsent);
        }

        let stmt = Statement::from_string(
            DatabaseBackend::MySql,
            format!("DROP TABLE IF EXISTS {}", quote_ident(&table)),
        );

        match conn.execute_raw(stmt).await {
            Ok(_) => {
                self.forget(namespace).await;
                self.release_schema_lock(namespace).await;
                info!(namespace, table = %table, "Dropped namespace");
                Ok(DropOutcome::Deleted)
            }
            Err(e) => match VectorDbError::from(e) {
                err @ VectorDbError::Connection(_) => Err(err),
                err => {
                    warn!(namespace, error = %err, "Failed to drop namespace");
                    Ok(DropOutcome::Failed(err.to_string()))
                }
            },
        }
    }
}
