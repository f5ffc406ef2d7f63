//! End-to-end ingestion and search over an in-memory store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use domain_vector_db::{
    DocumentData, DocumentVector, DocumentVectorRepository, DropOutcome, EmbeddingProvider,
    FsVectorCache, NO_DOCUMENTS_MESSAGE, NamespaceDescriptor, NamespaceStats, NeighborRow, SearchRequest,
    VectorDbError, VectorDbResult, VectorDbService, VectorRecord, VectorRepository,
    models::batch_dimension,
};
use test_utils::TestDataBuilder;
use tokio::sync::RwLock;

#[derive(Default)]
struct InMemoryRepository {
    namespaces: RwLock<HashMap<String, (usize, Vec<VectorRecord>)>>,
}

fn l2(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| ((x - y) as f64).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[async_trait]
impl VectorRepository for InMemoryRepository {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn heartbeat(&self) -> VectorDbResult<i64> {
        Ok(0)
    }

    async fn list_namespaces(&self) -> VectorDbResult<Vec<NamespaceDescriptor>> {
        Ok(self
            .namespaces
            .read()
            .await
            .keys()
            .map(|name| NamespaceDescriptor {
                name: name.clone(),
                table_name: name.clone(),
            })
            .collect())
    }

    async fn namespace_exists(&self, namespace: &str) -> VectorDbResult<bool> {
        Ok(self.namespaces.read().await.contains_key(namespace))
    }

    async fn namespace_count(&self, namespace: &str) -> VectorDbResult<u64> {
        Ok(self
            .namespaces
            .read()
            .await
            .get(namespace)
            .map_or(0, |(_, rows)| rows.len() as u64))
    }

    async fn total_count(&self) -> VectorDbResult<u64> {
        Ok(self
            .namespaces
            .read()
            .await
            .values()
            .map(|(_, rows)| rows.len() as u64)
            .sum())
    }

    async fn namespace_stats(&self, namespace: &str) -> VectorDbResult<Option<NamespaceStats>> {
        Ok(self
            .namespaces
            .read()
            .await
            .get(namespace)
            .map(|(dimension, rows)| NamespaceStats {
                name: namespace.to_string(),
                table_name: namespace.to_string(),
                dimension: Some(*dimension),
                row_count: rows.len() as u64,
                created_at: None,
            }))
    }

    async fn drop_namespace(&self, namespace: &str) -> VectorDbResult<DropOutcome> {
        Ok(match self.namespaces.write().await.remove(namespace) {
            Some(_) => DropOutcome::Deleted,
            None => DropOutcome::AlreadyAbsent,
        })
    }

    async fn upsert_collection(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> VectorDbResult<usize> {
        let dimension = batch_dimension(&records)?;
        let mut namespaces = self.namespaces.write().await;
        let (existing, rows) = namespaces
            .entry(namespace.to_string())
            .or_insert_with(|| (dimension, Vec::new()));

        if *existing != dimension {
            return Err(VectorDbError::DimensionMismatch {
                index: 0,
                expected: *existing,
                actual: dimension,
            });
        }

        let written = records.len();
        for record in records {
            rows.retain(|r| r.id != record.id);
            rows.push(record);
        }
        Ok(written)
    }

    async fn delete_vectors(&self, namespace: &str, ids: Vec<String>) -> VectorDbResult<u64> {
        let mut namespaces = self.namespaces.write().await;
        let Some((_, rows)) = namespaces.get_mut(namespace) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !ids.contains(&r.id));
        Ok((before - rows.len()) as u64)
    }

    async fn nearest(
        &self,
        namespace: &str,
        query: Vec<f32>,
        top_n: usize,
    ) -> VectorDbResult<Vec<NeighborRow>> {
        let namespaces = self.namespaces.read().await;
        let Some((_, rows)) = namespaces.get(namespace) else {
            return Err(VectorDbError::Transient("table doesn't exist".into()));
        };

        let mut scored: Vec<NeighborRow> = rows
            .iter()
            .map(|r| NeighborRow {
                id: r.id.clone(),
                distance: Some(l2(&r.values, &query)),
                metadata: r.metadata.clone(),
            })
            .collect();
        scored.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
        scored.truncate(top_n);
        Ok(scored)
    }
}

#[derive(Default)]
struct InMemoryMappings {
    rows: RwLock<Vec<DocumentVector>>,
}

impl InMemoryMappings {
    async fn count_for(&self, doc_id: &str) -> usize {
        self.rows
            .read()
            .await
            .iter()
            .filter(|m| m.doc_id == doc_id)
            .count()
    }
}

#[async_trait]
impl DocumentVectorRepository for InMemoryMappings {
    async fn bulk_insert(&self, mappings: Vec<DocumentVector>) -> VectorDbResult<()> {
        self.rows.write().await.extend(mappings);
        Ok(())
    }

    async fn vector_ids(&self, doc_id: &str) -> VectorDbResult<Vec<String>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|m| m.doc_id == doc_id)
            .map(|m| m.vector_id.clone())
            .collect())
    }

    async fn delete_for_document(&self, doc_id: &str) -> VectorDbResult<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|m| m.doc_id != doc_id);
        Ok((before - rows.len()) as u64)
    }
}

/// Character-histogram embedding: identical text gives identical vectors
#[derive(Default)]
struct HistogramEmbedder {
    chunk_calls: AtomicUsize,
}

const DIMENSION: usize = 16;

fn histogram(text: &str) -> Vec<f32> {
    let mut values = vec![0.0f32; DIMENSION];
    for c in text.chars() {
        values[c as usize % DIMENSION] += 1.0;
    }
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt().max(1.0);
    values.into_iter().map(|v| v / norm).collect()
}

#[async_trait]
impl EmbeddingProvider for HistogramEmbedder {
    fn name(&self) -> &'static str {
        "histogram"
    }

    fn max_chunk_length(&self) -> Option<usize> {
        None
    }

    async fn embed_text(&self, text: &str) -> VectorDbResult<Vec<f32>> {
        Ok(histogram(text))
    }

    async fn embed_chunks(&self, chunks: &[String]) -> VectorDbResult<Vec<Vec<f32>>> {
        self.chunk_calls.fetch_add(1, Ordering::SeqCst);
        Ok(chunks.iter().map(|c| histogram(c)).collect())
    }
}

struct Harness {
    service: VectorDbService<InMemoryRepository>,
    embedder: Arc<HistogramEmbedder>,
    mappings: Arc<InMemoryMappings>,
    _cache_dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let cache_dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(HistogramEmbedder::default());
    let mappings = Arc::new(InMemoryMappings::default());

    let service = VectorDbService::new(
        InMemoryRepository::default(),
        embedder.clone(),
        Arc::new(FsVectorCache::new(cache_dir.path().join("vector-cache"))),
        mappings.clone(),
    );

    Harness {
        service,
        embedder,
        mappings,
        _cache_dir: cache_dir,
    }
}

#[tokio::test]
async fn test_identity_recall_at_zero_threshold() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("identity_recall");
    let namespace = builder.namespace("recall");

    let passages = [
        "OceanBase keeps vectors in a VECTOR column.",
        "Rust ownership rules prevent data races.",
        "Workspaces group documents for retrieval.",
    ];
    for (i, passage) in passages.iter().enumerate() {
        let outcome = h
            .service
            .add_document(&namespace, DocumentData::new(builder.doc_id(i as u64), *passage), None)
            .await
            .unwrap();
        assert!(outcome.vectorized, "{:?}", outcome.error);
    }

    for passage in passages {
        let response = h
            .service
            .search(
                SearchRequest::new(&namespace, passage)
                    .with_embedder(h.embedder.clone())
                    .with_threshold(0.0),
            )
            .await
            .unwrap();

        assert!(response.context_texts.iter().any(|t| t == passage));
        assert_eq!(response.context_texts[0], passage);
        assert_eq!(response.message, None);
    }
}

#[tokio::test]
async fn test_cache_round_trip_skips_embedding() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("cache_round_trip");
    let namespace = builder.namespace("cache");
    let text = "lorem ipsum dolor sit amet ".repeat(150);
    let path = "custom-documents/lorem.json";

    let first = builder.doc_id(1);
    let outcome = h
        .service
        .add_document(&namespace, DocumentData::new(first.clone(), text.clone()), Some(path))
        .await
        .unwrap();
    assert!(outcome.vectorized);
    assert_eq!(h.embedder.chunk_calls.load(Ordering::SeqCst), 1);

    let second = builder.doc_id(2);
    let outcome = h
        .service
        .add_document(&namespace, DocumentData::new(second.clone(), text), Some(path))
        .await
        .unwrap();
    assert!(outcome.vectorized);
    assert_eq!(h.embedder.chunk_calls.load(Ordering::SeqCst), 1);

    let first_count = h.mappings.count_for(&first).await;
    assert!(first_count >= 3);
    assert_eq!(h.mappings.count_for(&second).await, first_count);
    assert_eq!(
        h.service.namespace_vector_count(&namespace).await.unwrap(),
        (first_count * 2) as u64
    );
}

#[tokio::test]
async fn test_long_document_is_chunked() {
    let h = harness();
    let namespace = TestDataBuilder::from_test_name("long_document").namespace("chunks");
    let text: String = (0..3000).map(|i| (b'a' + (i % 26) as u8) as char).collect();

    let outcome = h
        .service
        .add_document(&namespace, DocumentData::new("d1", text), None)
        .await
        .unwrap();

    assert!(outcome.vectorized);
    assert!(h.mappings.count_for("d1").await >= 3);
}

#[tokio::test]
async fn test_mismatched_dimension_is_rejected() {
    let h = harness();
    let namespace = TestDataBuilder::from_test_name("dimension").namespace("dims");
    h.service
        .add_document(&namespace, DocumentData::new("d1", "first document"), None)
        .await
        .unwrap();

    let wider = vec![VectorRecord::new("x", vec![0.1; DIMENSION + 1], Default::default())];
    assert!(matches!(
        h.service.repository().upsert_collection(&namespace, wider).await,
        Err(VectorDbError::DimensionMismatch { .. })
    ));
}

#[tokio::test]
async fn test_delete_document_then_namespace() {
    let h = harness();
    let namespace = TestDataBuilder::from_test_name("delete").namespace("gone");

    h.service
        .add_document(&namespace, DocumentData::new("d1", "to be removed"), None)
        .await
        .unwrap();
    assert!(h.service.delete_document(&namespace, "d1").await.unwrap());
    assert_eq!(h.service.namespace_vector_count(&namespace).await.unwrap(), 0);
    assert_eq!(h.mappings.count_for("d1").await, 0);

    // The namespace table is still there, just empty
    let response = h
        .service
        .search(SearchRequest::new(&namespace, "removed").with_embedder(h.embedder.clone()))
        .await
        .unwrap();
    assert!(response.context_texts.is_empty());
    assert!(response.sources.is_empty());
    assert_eq!(response.message.as_deref(), Some(NO_DOCUMENTS_MESSAGE));

    let response = h.service.delete_namespace(&namespace).await.unwrap();
    assert_eq!(response.outcome, DropOutcome::Deleted);
    assert_eq!(
        h.service.drop_namespace(&namespace).await.unwrap(),
        DropOutcome::AlreadyAbsent
    );

    let response = h
        .service
        .search(SearchRequest::new(&namespace, "removed").with_embedder(h.embedder.clone()))
        .await
        .unwrap();
    assert!(response.context_texts.is_empty());
    assert!(response.message.is_some());
}
