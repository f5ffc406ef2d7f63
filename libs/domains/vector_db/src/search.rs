//! Similarity search: embed the query, rank the namespace, score and curate.

use std::sync::Arc;

use database::common::{retry_when, RetryConfig};
use serde_json::Value;
use tracing::{debug, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{VectorDbError, VectorDbResult};
use crate::models::{Metadata, NeighborRow, SearchResponse, ThresholdPolicy, TEXT_KEY};
use crate::repository::VectorRepository;
use crate::service::VectorDbService;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.25;
pub const DEFAULT_TOP_N: usize = 4;

/// Message returned when the namespace has nothing to search
pub const NO_DOCUMENTS_MESSAGE: &str = "Invalid query - no documents found for workspace!";

/// Metadata key carrying the similarity score of a source
pub const SCORE_KEY: &str = "score";

#[derive(Clone)]
pub struct SearchRequest {
    pub namespace: String,
    pub input: String,
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
    pub similarity_threshold: f64,
    pub top_n: usize,
}

impl SearchRequest {
    pub fn new(namespace: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            input: input.into(),
            embedder: None,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            top_n: DEFAULT_TOP_N,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }
}

/// Map a raw distance to a similarity in `[0, 1]`.
///
/// Non-increasing in `distance`: `0 -> 1`, `>= 1 -> 0`, NULL or NaN `-> 0`.
/// Distances outside `[0, 1]` saturate.
pub fn distance_to_similarity(distance: Option<f64>) -> f64 {
    match distance {
        None => 0.0,
        Some(d) if d.is_nan() => 0.0,
        Some(d) if d <= 0.0 => 1.0,
        Some(d) if d >= 1.0 => 0.0,
        Some(d) => 1.0 - d,
    }
}

/// A neighbour with its similarity score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRow {
    pub row: NeighborRow,
    pub score: f64,
}

/// Score rows (closest first) and keep those at or above `threshold`
pub fn apply_threshold(rows: Vec<NeighborRow>, threshold: f64, policy: ThresholdPolicy) -> Vec<ScoredRow> {
    let mut kept = Vec::with_capacity(rows.len());

    for row in rows {
        let score = distance_to_similarity(row.distance);
        debug!(id = %row.id, distance = ?row.distance, score, "Scored row");

        if score < threshold {
            match policy {
                ThresholdPolicy::FilterAll => continue,
                ThresholdPolicy::StopAtFirstBelow => break,
            }
        }
        kept.push(ScoredRow { row, score });
    }

    kept
}

/// Build the caller-facing response from scored rows.
///
/// Rows with empty metadata carry no passage and are dropped from both
/// `context_texts` and `sources`, which stay index-aligned.
pub fn curate(rows: Vec<ScoredRow>) -> SearchResponse {
    let mut response = SearchResponse::default();

    for ScoredRow { row, score } in rows {
        if row.metadata.is_empty() {
            continue;
        }

        let text = match row.metadata.get(TEXT_KEY) {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let mut source: Metadata = row.metadata;
        source.insert(TEXT_KEY.to_string(), Value::String(text.clone()));
        if let Some(score) = serde_json::Number::from_f64(score) {
            source.insert(SCORE_KEY.to_string(), Value::Number(score));
        }

        response.context_texts.push(text);
        response.sources.push(source);
    }

    response
}

impl<R: VectorRepository> VectorDbService<R> {
    /// Rows for `query`, or `None` if `check_exists` is set and the namespace is gone
    async fn ranked_rows(
        &self,
        namespace: &str,
        query: &[f32],
        top_n: usize,
        check_exists: bool,
    ) -> VectorDbResult<Option<Vec<NeighborRow>>> {
        if check_exists && !self.guard(self.repository.namespace_exists(namespace)).await? {
            return Ok(None);
        }
        let rows = self
            .guard(self.repository.nearest(namespace, query.to_vec(), top_n))
            .await?;
        Ok(Some(rows))
    }

    /// Search one namespace for passages similar to `request.input`.
    ///
    /// A missing namespace is an empty response with a message, not an error.
    /// A namespace dropped mid-query is retried once and then ends the same way.
    pub async fn search(&self, request: SearchRequest) -> VectorDbResult<SearchResponse> {
        let embedder = match &request.embedder {
            Some(embedder) if !request.namespace.is_empty() && !request.input.is_empty() => {
                embedder.clone()
            }
            _ => {
                return Err(VectorDbError::InvalidArgument(
                    "search requires a namespace, an input and an embedding provider".to_string(),
                ));
            }
        };
        let namespace = request.namespace.as_str();

        if !self.guard(self.repository.namespace_exists(namespace)).await? {
            return Ok(SearchResponse::empty(NO_DOCUMENTS_MESSAGE));
        }

        let query = self.guard(embedder.embed_text(&request.input)).await?;
        if query.is_empty() {
            return Err(VectorDbError::Embedding(
                "embedding provider returned an empty query vector".to_string(),
            ));
        }

        // Existence was just checked; only a retry after a concurrent drop asks again.
        let mut first_attempt = true;
        let rows = retry_when(
            || {
                let check_exists = !std::mem::replace(&mut first_attempt, false);
                self.ranked_rows(namespace, &query, request.top_n, check_exists)
            },
            RetryConfig::new().with_max_retries(1).with_initial_delay(50),
            VectorDbError::is_retryable,
        )
        .await?;

        let rows = match rows {
            Some(rows) if !rows.is_empty() => rows,
            _ => {
                debug!(namespace, "Namespace holds no vectors");
                return Ok(SearchResponse::empty(NO_DOCUMENTS_MESSAGE));
            }
        };

        let fetched = rows.len();
        let scored = apply_threshold(rows, request.similarity_threshold, self.threshold_policy);
        let response = curate(scored);

        info!(
            namespace,
            fetched,
            returned = response.sources.len(),
            threshold = request.similarity_threshold,
            "Similarity search complete"
        );
        Ok(response)
    }
}
