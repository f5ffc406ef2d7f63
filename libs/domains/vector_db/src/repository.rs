use async_trait::async_trait;

use crate::error::VectorDbResult;
use crate::models::{DocumentVector, DropOutcome, NamespaceDescriptor, NamespaceStats, NeighborRow, VectorRecord};

/// Repository trait for namespace-scoped vector storage
///
/// This trait abstracts the underlying vector store (OceanBase).
/// Namespace names are caller-controlled; implementations derive the
/// physical collection name from them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorRepository: Send + Sync {
    /// Short backend identifier, e.g. `oceanbase`
    fn backend_name(&self) -> &'static str;

    // ===== Connection =====

    /// Re-open a connection and return a liveness timestamp in epoch millis
    async fn heartbeat(&self) -> VectorDbResult<i64>;

    // ===== Namespace Registry =====

    async fn list_namespaces(&self) -> VectorDbResult<Vec<NamespaceDescriptor>>;

    async fn namespace_exists(&self, namespace: &str) -> VectorDbResult<bool>;

    /// Rows stored for one namespace; zero when it does not exist
    async fn namespace_count(&self, namespace: &str) -> VectorDbResult<u64>;

    /// Sum of row counts over every namespace
    async fn total_count(&self) -> VectorDbResult<u64>;

    /// Catalog details, `None` if the namespace does not exist
    async fn namespace_stats(&self, namespace: &str) -> VectorDbResult<Option<NamespaceStats>>;

    /// Drop the namespace's collection. Absence is reported, not raised.
    async fn drop_namespace(&self, namespace: &str) -> VectorDbResult<DropOutcome>;

    // ===== Vector Operations =====

    /// Create the namespace schema if needed and write every record.
    ///
    /// Returns the number of records written.
    async fn upsert_collection(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> VectorDbResult<usize>;

    /// Delete vectors by id, returning how many rows were removed
    async fn delete_vectors(&self, namespace: &str, ids: Vec<String>) -> VectorDbResult<u64>;

    /// Top-N rows ordered by ascending distance to `query`
    async fn nearest(
        &self,
        namespace: &str,
        query: Vec<f32>,
        top_n: usize,
    ) -> VectorDbResult<Vec<NeighborRow>>;
}

/// Relational store linking documents to the vectors produced from them
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentVectorRepository: Send + Sync {
    async fn bulk_insert(&self, mappings: Vec<DocumentVector>) -> VectorDbResult<()>;

    /// Vector ids recorded for `doc_id`, in insertion order
    async fn vector_ids(&self, doc_id: &str) -> VectorDbResult<Vec<String>>;

    /// Remove the mappings of `doc_id`, returning how many were removed
    async fn delete_for_document(&self, doc_id: &str) -> VectorDbResult<u64>;
}
