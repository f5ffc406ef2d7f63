use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::EmbeddingProvider;
use crate::error::{VectorDbError, VectorDbResult};

/// Inputs per embeddings request
const MAX_INPUTS_PER_REQUEST: usize = 500;

/// OpenAI-compatible embeddings endpoint configuration
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Chunk length limit reported to ingestion
    pub max_chunk_length: usize,
}

impl OpenAIConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            max_chunk_length: 8191,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn with_max_chunk_length(mut self, max_chunk_length: usize) -> Self {
        self.max_chunk_length = max_chunk_length;
        self
    }

    /// `OPEN_AI_KEY` (required), `OPENAI_BASE_URL`, `EMBEDDING_MODEL_PREF`,
    /// `EMBEDDING_MODEL_MAX_CHUNK_LENGTH`
    pub fn from_env() -> VectorDbResult<Self> {
        let api_key = core_config::env_required("OPEN_AI_KEY")?;
        let mut config = Self::new(api_key);

        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL_PREF") {
            config.model = model;
        }
        if let Some(limit) = core_config::env_parse_optional("EMBEDDING_MODEL_MAX_CHUNK_LENGTH")? {
            config.max_chunk_length = limit;
        }

        Ok(config)
    }
}

/// OpenAI embeddings provider
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn from_env() -> VectorDbResult<Self> {
        Ok(Self::new(OpenAIConfig::from_env()?))
    }

    async fn request(&self, input: &[String]) -> VectorDbResult<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(VectorDbError::Embedding(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let body: EmbeddingResponse = response.json().await?;
        Ok(ordered_embeddings(body.data))
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// The API may answer out of order; `index` restores input order.
fn ordered_embeddings(mut data: Vec<EmbeddingData>) -> Vec<Vec<f32>> {
    data.sort_by_key(|d| d.index);
    data.into_iter().map(|d| d.embedding).collect()
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn max_chunk_length(&self) -> Option<usize> {
        Some(self.config.max_chunk_length)
    }

    async fn embed_text(&self, text: &str) -> VectorDbResult<Vec<f32>> {
        self.request(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| VectorDbError::Embedding("No embedding returned".to_string()))
    }

    async fn embed_chunks(&self, chunks: &[String]) -> VectorDbResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(MAX_INPUTS_PER_REQUEST) {
            debug!(inputs = batch.len(), model = %self.config.model, "Requesting embeddings");
            vectors.extend(self.request(batch).await?);
        }

        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_embeddings_restores_input_order() {
        let data = vec![
            EmbeddingData {
                embedding: vec![2.0],
                index: 1,
            },
            EmbeddingData {
                embedding: vec![1.0],
                index: 0,
            },
        ];

        assert_eq!(ordered_embeddings(data), vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn test_request_body_shape() {
        let input = vec!["alpha".to_string(), "beta".to_string()];
        let body = serde_json::to_value(EmbeddingRequest {
            model: "text-embedding-3-small",
            input: &input,
        })
        .unwrap();

        assert_eq!(body["model"], "text-embedding-3-small");
        assert_eq!(body["input"][1], "beta");
    }

    #[test]
    fn test_config_builders() {
        let config = OpenAIConfig::new("sk-test".to_string())
            .with_base_url("http://localhost:8080/v1".to_string())
            .with_model("nomic-embed-text".to_string())
            .with_max_chunk_length(1000);

        let provider = OpenAIProvider::new(config);
        assert_eq!(provider.max_chunk_length(), Some(1000));
        assert_eq!(provider.name(), "openai");
    }

    #[tokio::test]
    async fn test_embed_chunks_empty_input_makes_no_request() {
        // Unroutable base URL: any request would fail.
        let provider = OpenAIProvider::new(
            OpenAIConfig::new("sk-test".to_string()).with_base_url("http://127.0.0.1:1".to_string()),
        );

        assert!(provider.embed_chunks(&[]).await.unwrap().is_empty());
    }
}
