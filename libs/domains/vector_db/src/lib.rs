//! Vector DB Domain Library
//!
//! Namespace-scoped vector storage and similarity search for the document
//! retrieval pipeline, backed by OceanBase.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  VectorDbProvider   │  ← Backend-agnostic contract used by callers
//! └──────────┬──────────┘
//!            │
//! ┌──────────▼──────────┐
//! │   VectorDbService   │  ← Ingestion, search, namespace admin
//! └──────────┬──────────┘
//!            │
//!   ┌────────┴─────────┬──────────────────────┬───────────────────────────┐
//!   │                  │                      │                           │
//! VectorRepository   EmbeddingProvider      VectorCache                 DocumentVectorRepository
//!   │                  │                      │                           │
//! OceanBaseRepository  OpenAIProvider         FsVectorCache               SqlDocumentVectorRepository
//! ```
//!
//! # Features
//!
//! - **Lazy namespaces**: a namespace table is created on its first write,
//!   sized to the first vector's dimension
//! - **Transactional upsert**: a failing record rolls back its batch and is
//!   reported by index
//! - **Cache-aware ingestion**: re-ingesting a cached file skips embedding
//! - **Scored search**: distances become similarities in `[0, 1]`, filtered by
//!   a threshold and curated into source records
//! - **Cancellation**: every store and embedding call races a
//!   `CancellationToken`
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use core_config::FromEnv;
//! use core_config::vector_db::{VectorCacheConfig, VectorDbSelection};
//! use database::oceanbase::OceanBaseConfig;
//! use domain_vector_db::{
//!     DocumentData, FsVectorCache, OceanBaseClient, OceanBaseRepository, OpenAIProvider,
//!     SearchRequest, SqlDocumentVectorRepository, StoreOptions, VectorDbService,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OceanBaseClient::new(OceanBaseConfig::from_env()?, VectorDbSelection::from_env()?);
//! let mappings = SqlDocumentVectorRepository::new(client.connect().await?);
//! mappings.ensure_table().await?;
//!
//! let repository = OceanBaseRepository::new(client, StoreOptions::from_env()?);
//! let embedder = Arc::new(OpenAIProvider::from_env()?);
//! let cache = FsVectorCache::from_config(&VectorCacheConfig::from_env()?);
//!
//! let service = VectorDbService::new(repository, embedder.clone(), Arc::new(cache), Arc::new(mappings));
//!
//! let document = DocumentData::new("doc-1", "OceanBase stores vectors next to rows.");
//! service.add_document("workspace-1", document, Some("custom-documents/doc-1.json")).await?;
//!
//! let response = service
//!     .search(SearchRequest::new("workspace-1", "where are vectors stored?").with_embedder(embedder))
//!     .await?;
//! println!("{:?}", response.context_texts);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod chunking;
pub mod embedding;
pub mod entity;
pub mod error;
pub mod ingestion;
pub mod mappings;
pub mod models;
pub mod oceanbase;
pub mod provider;
pub mod repository;
pub mod search;
pub mod service;

// Re-export commonly used types
pub use cache::{FsVectorCache, VectorCache};
pub use chunking::{CharacterTextSplitter, TextSplitter, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use embedding::{EmbeddingProvider, OpenAIConfig, OpenAIProvider};
pub use error::{VectorDbError, VectorDbResult};
pub use mappings::SqlDocumentVectorRepository;
pub use models::{
    AddDocumentOutcome, CachedChunk, CachedVectors, DeleteNamespaceResponse, DistanceMetric,
    DocumentData, DocumentVector, DropOutcome, Heartbeat, Metadata, NamespaceDescriptor,
    NamespaceStats, NeighborRow, SearchResponse, ThresholdPolicy, VectorRecord, TEXT_KEY,
};
pub use oceanbase::{OceanBaseClient, OceanBaseRepository, StoreOptions};
pub use provider::VectorDbProvider;
pub use repository::{DocumentVectorRepository, VectorRepository};
pub use search::{
    distance_to_similarity, SearchRequest, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_TOP_N,
    NO_DOCUMENTS_MESSAGE,
};
pub use service::VectorDbService;
