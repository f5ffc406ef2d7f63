use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cache::VectorCache;
use crate::chunking::{CharacterTextSplitter, TextSplitter, DEFAULT_CHUNK_SIZE};
use crate::embedding::EmbeddingProvider;
use crate::error::{VectorDbError, VectorDbResult};
use crate::models::{
    DeleteNamespaceResponse, DropOutcome, Heartbeat, NamespaceDescriptor, NamespaceStats,
    ThresholdPolicy,
};
use crate::repository::{DocumentVectorRepository, VectorRepository};

/// Vector service providing the provider-level operations
///
/// Combines a namespace-scoped vector store with the collaborators ingestion
/// needs (embedding, chunking, the vector cache and the mapping store).
/// Every store and embedding round-trip races the service's cancellation token.
pub struct VectorDbService<R: VectorRepository> {
    pub(crate) repository: R,
    pub(crate) embedder: Arc<dyn EmbeddingProvider>,
    pub(crate) splitter: Arc<dyn TextSplitter>,
    pub(crate) cache: Arc<dyn VectorCache>,
    pub(crate) mappings: Arc<dyn DocumentVectorRepository>,
    pub(crate) threshold_policy: ThresholdPolicy,
    max_chunk_length: Option<usize>,
    cancel: CancellationToken,
}

impl<R: VectorRepository> VectorDbService<R> {
    pub fn new(
        repository: R,
        embedder: Arc<dyn EmbeddingProvider>,
        cache: Arc<dyn VectorCache>,
        mappings: Arc<dyn DocumentVectorRepository>,
    ) -> Self {
        Self {
            repository,
            embedder,
            splitter: Arc::new(CharacterTextSplitter::new()),
            cache,
            mappings,
            threshold_policy: ThresholdPolicy::default(),
            max_chunk_length: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_splitter(mut self, splitter: Arc<dyn TextSplitter>) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_threshold_policy(mut self, policy: ThresholdPolicy) -> Self {
        self.threshold_policy = policy;
        self
    }

    /// Chunk length override, e.g. from `EMBEDDING_MODEL_MAX_CHUNK_LENGTH`
    pub fn with_max_chunk_length(mut self, max_chunk_length: Option<usize>) -> Self {
        self.max_chunk_length = max_chunk_length;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Chunk size for new documents: override, then engine limit, then 1000
    pub fn chunk_size(&self) -> usize {
        self.max_chunk_length
            .or_else(|| self.embedder.max_chunk_length())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_CHUNK_SIZE)
    }

    /// Await `fut` unless the service is cancelled first
    pub(crate) async fn guard<T, F>(&self, fut: F) -> VectorDbResult<T>
    where
        F: Future<Output = VectorDbResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(VectorDbError::Cancelled),
            result = fut => result,
        }
    }

    // ===== Connection =====

    pub async fn heartbeat(&self) -> VectorDbResult<Heartbeat> {
        let heartbeat = self.guard(self.repository.heartbeat()).await?;
        Ok(Heartbeat { heartbeat })
    }

    // ===== Namespace Registry =====

    pub async fn list_namespaces(&self) -> VectorDbResult<Vec<NamespaceDescriptor>> {
        self.guard(self.repository.list_namespaces()).await
    }

    pub async fn namespace_exists(&self, namespace: &str) -> VectorDbResult<bool> {
        require_namespace(namespace)?;
        self.guard(self.repository.namespace_exists(namespace)).await
    }

    /// Like [`Self::namespace_exists`] but an empty name is simply absent
    pub async fn has_namespace(&self, namespace: &str) -> VectorDbResult<bool> {
        if namespace.is_empty() {
            return Ok(false);
        }
        self.namespace_exists(namespace).await
    }

    pub async fn total_vector_count(&self) -> VectorDbResult<u64> {
        self.guard(self.repository.total_count()).await
    }

    pub async fn namespace_vector_count(&self, namespace: &str) -> VectorDbResult<u64> {
        require_namespace(namespace)?;
        self.guard(self.repository.namespace_count(namespace)).await
    }

    pub async fn namespace_stats(&self, namespace: &str) -> VectorDbResult<NamespaceStats> {
        require_namespace(namespace)?;
        self.guard(self.repository.namespace_stats(namespace))
            .await?
            .ok_or_else(|| VectorDbError::NamespaceNotFound(namespace.to_string()))
    }

    /// Drop a namespace that must exist
    pub async fn delete_namespace(&self, namespace: &str) -> VectorDbResult<DeleteNamespaceResponse> {
        if !self.namespace_exists(namespace).await? {
            return Err(VectorDbError::NamespaceNotFound(namespace.to_string()));
        }

        let outcome = self.drop_namespace(namespace).await?;
        let message = match &outcome {
            DropOutcome::Deleted => format!("Namespace {} was deleted.", namespace),
            DropOutcome::AlreadyAbsent => format!("Namespace {} was already deleted.", namespace),
            DropOutcome::Failed(reason) => {
                format!("Failed to delete namespace {}: {}", namespace, reason)
            }
        };

        Ok(DeleteNamespaceResponse { outcome, message })
    }

    /// Idempotent drop: a missing namespace is `AlreadyAbsent`, not an error
    pub async fn drop_namespace(&self, namespace: &str) -> VectorDbResult<DropOutcome> {
        require_namespace(namespace)?;
        let outcome = self.guard(self.repository.drop_namespace(namespace)).await?;

        match &outcome {
            DropOutcome::Failed(reason) => warn!(namespace, reason = %reason, "Namespace drop failed"),
            other => info!(namespace, outcome = ?other, "Namespace dropped"),
        }
        Ok(outcome)
    }
}

pub(crate) fn require_namespace(namespace: &str) -> VectorDbResult<()> {
    if namespace.is_empty() {
        return Err(VectorDbError::InvalidArgument(
            "namespace name is required".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::MockVectorCache;
    use crate::embedding::MockEmbeddingProvider;
    use crate::repository::{MockDocumentVectorRepository, MockVectorRepository};

    pub(crate) struct Mocks {
        pub repository: MockVectorRepository,
        pub embedder: MockEmbeddingProvider,
        pub cache: MockVectorCache,
        pub mappings: MockDocumentVectorRepository,
    }

    impl Mocks {
        pub fn new() -> Self {
            let mut embedder = MockEmbeddingProvider::new();
            embedder.expect_max_chunk_length().return_const(None);
            embedder.expect_name().return_const("mock");
            Self {
                repository: MockVectorRepository::new(),
                embedder,
                cache: MockVectorCache::new(),
                mappings: MockDocumentVectorRepository::new(),
            }
        }

        pub fn into_service(self) -> VectorDbService<MockVectorRepository> {
            VectorDbService::new(
                self.repository,
                Arc::new(self.embedder),
                Arc::new(self.cache),
                Arc::new(self.mappings),
            )
        }
    }

    #[tokio::test]
    async fn test_heartbeat() {
        let mut mocks = Mocks::new();
        mocks
            .repository
            .expect_heartbeat()
            .returning(|| Ok(1_760_000_000_000));

        let beat = mocks.into_service().heartbeat().await.unwrap();
        assert_eq!(beat.heartbeat, 1_760_000_000_000);
    }

    #[tokio::test]
    async fn test_has_namespace_empty_name_is_false() {
        let service = Mocks::new().into_service();
        assert!(!service.has_namespace("").await.unwrap());
        assert!(matches!(
            service.namespace_exists("").await,
            Err(VectorDbError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_namespace_stats_absent_is_not_found() {
        let mut mocks = Mocks::new();
        mocks
            .repository
            .expect_namespace_stats()
            .returning(|_| Ok(None));

        assert!(matches!(
            mocks.into_service().namespace_stats("ghost").await,
            Err(VectorDbError::NamespaceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_namespace_requires_existence() {
        let mut mocks = Mocks::new();
        mocks
            .repository
            .expect_namespace_exists()
            .returning(|_| Ok(false));
        mocks.repository.expect_drop_namespace().never();

        assert!(matches!(
            mocks.into_service().delete_namespace("ghost").await,
            Err(VectorDbError::NamespaceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_namespace_message() {
        let mut mocks = Mocks::new();
        mocks
            .repository
            .expect_namespace_exists()
            .returning(|_| Ok(true));
        mocks
            .repository
            .expect_drop_namespace()
            .returning(|_| Ok(DropOutcome::Deleted));

        let response = mocks.into_service().delete_namespace("ws1").await.unwrap();
        assert_eq!(response.outcome, DropOutcome::Deleted);
        assert_eq!(response.message, "Namespace ws1 was deleted.");
    }

    #[tokio::test]
    async fn test_drop_namespace_twice_succeeds() {
        let mut mocks = Mocks::new();
        let mut seq = mockall::Sequence::new();
        mocks
            .repository
            .expect_drop_namespace()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(DropOutcome::Deleted));
        mocks
            .repository
            .expect_drop_namespace()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(DropOutcome::AlreadyAbsent));
        let service = mocks.into_service();

        assert!(service.drop_namespace("ws1").await.unwrap().is_success());
        assert_eq!(
            service.drop_namespace("ws1").await.unwrap(),
            DropOutcome::AlreadyAbsent
        );
    }

    #[tokio::test]
    async fn test_cancelled_service_short_circuits() {
        let mut mocks = Mocks::new();
        mocks
            .repository
            .expect_total_count()
            .returning(|| Ok(10));
        let token = CancellationToken::new();
        let service = mocks.into_service().with_cancellation(token.clone());

        token.cancel();
        assert!(matches!(
            service.total_vector_count().await,
            Err(VectorDbError::Cancelled)
        ));
    }

    #[test]
    fn test_chunk_size_precedence() {
        let service = Mocks::new().into_service();
        assert_eq!(service.chunk_size(), DEFAULT_CHUNK_SIZE);

        let service = Mocks::new().into_service().with_max_chunk_length(Some(512));
        assert_eq!(service.chunk_size(), 512);
    }
}
