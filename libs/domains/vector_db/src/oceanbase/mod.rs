//! OceanBase-backed implementation of [`VectorRepository`].
//!
//! Each namespace is one table named `<prefix><namespace>` with columns
//! `id VARCHAR(40)`, `embedding VECTOR(n)` and `metadata JSON`. The table is
//! created on the first write and its vector dimension is fixed from then on.

mod client;
mod config;
mod query;
mod registry;
mod sql;
mod writer;

pub use client::{ConnectionScope, OceanBaseClient, BACKEND_NAME};
pub use config::StoreOptions;
pub use registry::NamespaceRegistry;
pub use writer::MAX_ID_LEN;

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
use tracing::{debug, info, warn};

use crate::error::{VectorDbError, VectorDbResult};
use crate::models::{
    batch_dimension, DropOutcome, NamespaceDescriptor, NamespaceStats, NeighborRow, VectorRecord,
};
use crate::repository::VectorRepository;

pub struct OceanBaseRepository {
    client: OceanBaseClient,
    options: StoreOptions,
    registry: NamespaceRegistry,
}

impl OceanBaseRepository {
    pub fn new(client: OceanBaseClient, options: StoreOptions) -> Self {
        let registry = NamespaceRegistry::new(options.table_prefix.clone());
        Self {
            client,
            options,
            registry,
        }
    }

    pub fn client(&self) -> &OceanBaseClient {
        &self.client
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }
}

#[async_trait]
impl VectorRepository for OceanBaseRepository {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn heartbeat(&self) -> VectorDbResult<i64> {
        self.client.heartbeat().await
    }

    async fn list_namespaces(&self) -> VectorDbResult<Vec<NamespaceDescriptor>> {
        let conn = self.client.scope().await?;
        self.registry.list(&*conn).await
    }

    async fn namespace_exists(&self, namespace: &str) -> VectorDbResult<bool> {
        let conn = self.client.scope().await?;
        self.registry.exists(&*conn, namespace).await
    }

    async fn namespace_count(&self, namespace: &str) -> VectorDbResult<u64> {
        let table = self.registry.table_for(namespace)?;
        let conn = self.client.scope().await?;
        if !self.registry.exists(&*conn, namespace).await? {
            return Ok(0);
        }
        self.registry.row_count(&*conn, &table).await
    }

    async fn total_count(&self) -> VectorDbResult<u64> {
        let conn = self.client.scope().await?;
        let mut total = 0;
        for namespace in self.registry.list(&*conn).await? {
            total += self.registry.row_count(&*conn, &namespace.table_name).await?;
        }
        Ok(total)
    }

    async fn namespace_stats(&self, namespace: &str) -> VectorDbResult<Option<NamespaceStats>> {
        let conn = self.client.scope().await?;
        self.registry.stats(&*conn, namespace).await
    }

    async fn drop_namespace(&self, namespace: &str) -> VectorDbResult<DropOutcome> {
        let conn = self.client.scope().await?;
        self.registry.drop_namespace(&*conn, namespace).await
    }

    async fn upsert_collection(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> VectorDbResult<usize> {
        let dimension = batch_dimension(&records)?;
        let table = self.registry.table_for(namespace)?;
        let conn = self.client.scope().await?;

        writer::ensure_schema(&*conn, &self.registry, &self.options, namespace, dimension).await?;
        let written = match writer::write_records(&conn, &table, &records).await {
            Err(VectorDbError::Transient(reason)) => {
                warn!(namespace, reason = %reason, "Namespace table vanished during upsert, recreating");
                self.registry.forget(namespace).await;
                writer::ensure_schema(&*conn, &self.registry, &self.options, namespace, dimension)
                    .await?;
                writer::write_records(&conn, &table, &records).await?
            }
            result => result?,
        };

        info!(namespace, records = written, dimension, "Upserted collection");
        Ok(written)
    }

    async fn delete_vectors(&self, namespace: &str, ids: Vec<String>) -> VectorDbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let table = self.registry.table_for(namespace)?;
        let conn = self.client.scope().await?;
        if !self.registry.exists(&*conn, namespace).await? {
            debug!(namespace, "Delete on absent namespace");
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::MySql,
            format!(
                "DELETE FROM {} WHERE id IN ({})",
                sql::quote_ident(&table),
                placeholders
            ),
            ids.into_iter().map(Into::into),
        );

        let result = conn.execute_raw(stmt).await?;
        info!(namespace, deleted = result.rows_affected(), "Deleted vectors");
        Ok(result.rows_affected())
    }

    async fn nearest(
        &self,
        namespace: &str,
        query: Vec<f32>,
        top_n: usize,
    ) -> VectorDbResult<Vec<NeighborRow>> {
        let table = self.registry.table_for(namespace)?;
        let conn = self.client.scope().await?;

        if let Some(dimension) = self.registry.dimension(&*conn, namespace).await? {
            if dimension != query.len() {
                return Err(VectorDbError::DimensionMismatch {
                    index: 0,
                    expected: dimension,
                    actual: query.len(),
                });
            }
        }

        query::nearest(&*conn, &table, &query, top_n, &self.options).await
    }
}
