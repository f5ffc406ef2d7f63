//! Document ingestion: cache lookup, chunk and embed, write, record mappings.

use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::chunking::DEFAULT_CHUNK_OVERLAP;
use crate::error::{VectorDbError, VectorDbResult};
use crate::models::{
    AddDocumentOutcome, CachedChunk, CachedVectors, DocumentData, DocumentVector, VectorRecord,
    TEXT_KEY,
};
use crate::repository::VectorRepository;
use crate::service::{require_namespace, VectorDbService};

/// Records per vector cache batch
pub const CACHE_BATCH_SIZE: usize = 500;

impl<R: VectorRepository> VectorDbService<R> {
    /// Vectorize `document` into `namespace`.
    ///
    /// Failures of this one document come back as `{vectorized: false, error}`
    /// so batch ingestion can continue; only configuration, connection and
    /// cancellation errors are returned as `Err`.
    pub async fn add_document(
        &self,
        namespace: &str,
        document: DocumentData,
        full_file_path: Option<&str>,
    ) -> VectorDbResult<AddDocumentOutcome> {
        if document.page_content.is_empty() {
            return Ok(AddDocumentOutcome::skipped());
        }

        let doc_id = document.doc_id.clone();
        match self.ingest(namespace, document, full_file_path).await {
            Ok(written) => {
                info!(namespace, doc_id = %doc_id, records = written, "Document vectorized");
                Ok(AddDocumentOutcome::vectorized())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                error!(namespace, doc_id = %doc_id, error = %e, "Failed to add document to namespace");
                Ok(AddDocumentOutcome::failed(e.to_string()))
            }
        }
    }

    async fn ingest(
        &self,
        namespace: &str,
        document: DocumentData,
        full_file_path: Option<&str>,
    ) -> VectorDbResult<usize> {
        require_namespace(namespace)?;
        info!(namespace, doc_id = %document.doc_id, "Adding new vectorized document into namespace");

        if let Some(path) = full_file_path {
            let cached = self.cached_vectors(path).await?;
            if cached.exists {
                return self.ingest_cached(namespace, &document.doc_id, cached).await;
            }
        }

        let chunks = self.splitter.split(
            &document.page_content,
            self.chunk_size(),
            DEFAULT_CHUNK_OVERLAP,
        )?;
        info!(namespace, chunks = chunks.len(), "Chunks created from document");

        let vectors = if chunks.is_empty() {
            Vec::new()
        } else {
            self.guard(self.embedder.embed_chunks(&chunks)).await?
        };
        if vectors.is_empty() {
            return Err(VectorDbError::Embedding(
                "Could not embed document chunks! This document will not be recorded.".to_string(),
            ));
        }
        if vectors.len() != chunks.len() {
            return Err(VectorDbError::Embedding(format!(
                "embedding provider returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let mut records = Vec::with_capacity(vectors.len());
        let mut mappings = Vec::with_capacity(vectors.len());
        for (text, values) in chunks.into_iter().zip(vectors) {
            let id = Uuid::new_v4().to_string();
            let mut metadata = document.metadata.clone();
            metadata.insert(TEXT_KEY.to_string(), Value::String(text));

            mappings.push(DocumentVector {
                doc_id: document.doc_id.clone(),
                vector_id: id.clone(),
            });
            records.push(VectorRecord::new(id, values, metadata));
        }

        let cache_batches: Vec<Vec<CachedChunk>> = records
            .chunks(CACHE_BATCH_SIZE)
            .map(|batch| batch.iter().map(CachedChunk::from).collect())
            .collect();

        let written = self
            .guard(self.repository.upsert_collection(namespace, records))
            .await?;

        if let Some(path) = full_file_path {
            self.store_cached(&cache_batches, path).await?;
        }

        self.record_mappings(namespace, mappings).await?;
        Ok(written)
    }

    /// Re-write cached chunks under fresh vector ids
    async fn ingest_cached(
        &self,
        namespace: &str,
        doc_id: &str,
        cached: CachedVectors,
    ) -> VectorDbResult<usize> {
        let mut records = Vec::new();
        let mut mappings = Vec::new();

        for chunk in cached.chunks.into_iter().flatten() {
            let id = Uuid::new_v4().to_string();
            mappings.push(DocumentVector {
                doc_id: doc_id.to_string(),
                vector_id: id.clone(),
            });
            records.push(VectorRecord::new(id, chunk.values, chunk.metadata));
        }
        info!(namespace, doc_id, records = records.len(), "Reusing cached vectors");

        let written = self
            .guard(self.repository.upsert_collection(namespace, records))
            .await?;
        self.record_mappings(namespace, mappings).await?;
        Ok(written)
    }

    /// Record which vectors belong to the document.
    ///
    /// Runs after the vectors are written. If it fails they could never be
    /// deleted by document, so they are removed again before the error is returned.
    async fn record_mappings(&self, namespace: &str, mappings: Vec<DocumentVector>) -> VectorDbResult<()> {
        let ids: Vec<String> = mappings.iter().map(|m| m.vector_id.clone()).collect();

        let Err(err) = self.guard(self.mappings.bulk_insert(mappings)).await else {
            return Ok(());
        };

        error!(namespace, vector_ids = ?ids, error = %err, "Failed to record document vectors, removing them");
        match self.repository.delete_vectors(namespace, ids).await {
            Ok(removed) => info!(namespace, removed, "Removed unrecorded vectors"),
            Err(e) => error!(namespace, error = %e, "Unrecorded vectors left in namespace"),
        }
        Err(err)
    }

    /// Cache lookup; an unreadable cache counts as a miss
    async fn cached_vectors(&self, path: &str) -> VectorDbResult<CachedVectors> {
        match self.guard(self.cache.cached(path)).await {
            Ok(cached) => Ok(cached),
            Err(VectorDbError::Cancelled) => Err(VectorDbError::Cancelled),
            Err(e) => {
                warn!(path, error = %e, "Vector cache lookup failed");
                Ok(CachedVectors::miss())
            }
        }
    }

    /// The vectors are already written; a cache failure only costs a re-embed later
    async fn store_cached(&self, batches: &[Vec<CachedChunk>], path: &str) -> VectorDbResult<()> {
        match self.guard(self.cache.store(batches, path)).await {
            Ok(()) => Ok(()),
            Err(VectorDbError::Cancelled) => Err(VectorDbError::Cancelled),
            Err(e) => {
                warn!(path, error = %e, "Failed to store vectors in cache");
                Ok(())
            }
        }
    }

    /// Remove a document's vectors from `namespace` and forget its mappings.
    ///
    /// A document with no recorded vectors is a successful no-op.
    pub async fn delete_document(&self, namespace: &str, doc_id: &str) -> VectorDbResult<bool> {
        require_namespace(namespace)?;
        if doc_id.is_empty() {
            return Err(VectorDbError::InvalidArgument(
                "document id is required".to_string(),
            ));
        }

        let ids = self.guard(self.mappings.vector_ids(doc_id)).await?;
        if ids.is_empty() {
            return Ok(true);
        }

        let deleted = self
            .guard(self.repository.delete_vectors(namespace, ids))
            .await?;
        let forgotten = self
            .guard(self.mappings.delete_for_document(doc_id))
            .await?;

        info!(namespace, doc_id, deleted, mappings = forgotten, "Deleted document vectors");
        Ok(true)
    }
}
