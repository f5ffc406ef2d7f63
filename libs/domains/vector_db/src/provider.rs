use async_trait::async_trait;

use crate::error::VectorDbResult;
use crate::models::{
    AddDocumentOutcome, DeleteNamespaceResponse, DocumentData, Heartbeat, NamespaceDescriptor,
    NamespaceStats, SearchResponse,
};
use crate::repository::VectorRepository;
use crate::search::SearchRequest;
use crate::service::VectorDbService;

/// The operations callers use regardless of the backing store.
///
/// Retrieval pipelines and namespace-admin endpoints hold a
/// `dyn VectorDbProvider` and never see the storage backend.
#[async_trait]
pub trait VectorDbProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn heartbeat(&self) -> VectorDbResult<Heartbeat>;

    async fn list_namespaces(&self) -> VectorDbResult<Vec<NamespaceDescriptor>>;

    async fn namespace_exists(&self, namespace: &str) -> VectorDbResult<bool>;

    async fn has_namespace(&self, namespace: &str) -> VectorDbResult<bool>;

    async fn total_vector_count(&self) -> VectorDbResult<u64>;

    async fn namespace_vector_count(&self, namespace: &str) -> VectorDbResult<u64>;

    async fn namespace_stats(&self, namespace: &str) -> VectorDbResult<NamespaceStats>;

    async fn delete_namespace(&self, namespace: &str) -> VectorDbResult<DeleteNamespaceResponse>;

    async fn add_document(
        &self,
        namespace: &str,
        document: DocumentData,
        full_file_path: Option<&str>,
    ) -> VectorDbResult<AddDocumentOutcome>;

    async fn delete_document(&self, namespace: &str, doc_id: &str) -> VectorDbResult<bool>;

    async fn search(&self, request: SearchRequest) -> VectorDbResult<SearchResponse>;
}

#[async_trait]
impl<R: VectorRepository> VectorDbProvider for VectorDbService<R> {
    fn name(&self) -> &'static str {
        self.repository.backend_name()
    }

    async fn heartbeat(&self) -> VectorDbResult<Heartbeat> {
        VectorDbService::heartbeat(self).await
    }

    async fn list_namespaces(&self) -> VectorDbResult<Vec<NamespaceDescriptor>> {
        VectorDbService::list_namespaces(self).await
    }

    async fn namespace_exists(&self, namespace: &str) -> VectorDbResult<bool> {
        VectorDbService::namespace_exists(self, namespace).await
    }

    async fn has_namespace(&self, namespace: &str) -> VectorDbResult<bool> {
        VectorDbService::has_namespace(self, namespace).await
    }

    async fn total_vector_count(&self) -> VectorDbResult<u64> {
        VectorDbService::total_vector_count(self).await
    }

    async fn namespace_vector_count(&self, namespace: &str) -> VectorDbResult<u64> {
        VectorDbService::namespace_vector_count(self, namespace).await
    }

    async fn namespace_stats(&self, namespace: &str) -> VectorDbResult<NamespaceStats> {
        VectorDbService::namespace_stats(self, namespace).await
    }

    async fn delete_namespace(&self, namespace: &str) -> VectorDbResult<DeleteNamespaceResponse> {
        VectorDbService::delete_namespace(self, namespace).await
    }

    async fn add_document(
        &self,
        namespace: &str,
        document: DocumentData,
        full_file_path: Option<&str>,
    ) -> VectorDbResult<AddDocumentOutcome> {
        VectorDbService::add_document(self, namespace, document, full_file_path).await
    }

    async fn delete_document(&self, namespace: &str, doc_id: &str) -> VectorDbResult<bool> {
        VectorDbService::delete_document(self, namespace, doc_id).await
    }

    async fn search(&self, request: SearchRequest) -> VectorDbResult<SearchResponse> {
        VectorDbService::search(self, request).await
    }
}
