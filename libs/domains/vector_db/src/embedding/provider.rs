use async_trait::async_trait;

use crate::error::VectorDbResult;

/// Turns text into vectors.
///
/// Ingestion uses `embed_chunks`; search uses `embed_text` on the query.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short identifier for logs
    fn name(&self) -> &'static str;

    /// Largest chunk (in characters) the engine accepts, if it has a limit
    fn max_chunk_length(&self) -> Option<usize>;

    /// Embed a single query string
    async fn embed_text(&self, text: &str) -> VectorDbResult<Vec<f32>>;

    /// Embed many chunks; the result is index-aligned with the input
    async fn embed_chunks(&self, chunks: &[String]) -> VectorDbResult<Vec<Vec<f32>>>;
}
