//! Embedding client for OpenAI-compatible endpoints

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::embeddings::CreateEmbeddingRequestArgs,
};
use async_trait::async_trait;
use deal_core::EmbeddingSettings;
use tracing::{debug, instrument};

use crate::{
    error::{EmbeddingError, Result},
    types::EmbeddingVector,
};

/// Anything that maps text to fixed-length vectors
#[async_trait]
pub trait TextEncoder: Send + Sync {
    /// Encode a batch of texts, preserving order
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>>;

    /// Dimension of every vector this encoder returns
    fn dimension(&self) -> usize;

    /// Encode a single text
    async fn encode(&self, text: &str) -> Result<EmbeddingVector> {
        self.encode_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| EmbeddingError::Config("No embeddings returned from API".to_string()))
    }
}

/// Embedding client
///
/// Works with OpenAI itself or any server exposing the same `/embeddings`
/// API (e.g. a local sentence-transformers deployment of all-MiniLM-L6-v2).
pub struct EmbeddingClient {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: usize,
}

impl EmbeddingClient {
    /// Create a new embedding client from explicit settings
    pub fn new(settings: &EmbeddingSettings) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(settings.api_key.clone())
            .with_api_base(settings.api_base.clone());
        Self {
            client: Client::with_config(config),
            model: settings.model.clone(),
            dimension: settings.dimension,
        }
    }

    /// Get the embedding model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextEncoder for EmbeddingClient {
    #[instrument(skip(self, texts), fields(batch = texts.len()))]
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(texts.to_vec())
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        if response.data.len() != texts.len() {
            return Err(EmbeddingError::Config(format!(
                "Expected {} embeddings, API returned {}",
                texts.len(),
                response.data.len()
            )));
        }

        let mut data = response.data;
        data.sort_by_key(|e| e.index);

        let mut vectors = Vec::with_capacity(data.len());
        for embedding in data {
            // Validate dimension
            if embedding.embedding.len() != self.dimension {
                return Err(EmbeddingError::InvalidDimension {
                    expected: self.dimension,
                    actual: embedding.embedding.len(),
                });
            }
            vectors.push(embedding.embedding);
        }

        debug!(
            "Generated {} embeddings: dimension={}, model={}",
            vectors.len(),
            self.dimension,
            self.model
        );

        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

impl std::fmt::Debug for EmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingClient")
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Option<EmbeddingSettings> {
        let api_key = std::env::var("OPENAI_API_KEY").ok()?;
        Some(EmbeddingSettings {
            api_key,
            api_base: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
        })
    }

    #[tokio::test]
    #[ignore] // Requires API key
    async fn test_encode_batch() {
        let client = EmbeddingClient::new(&settings().expect("OPENAI_API_KEY not set"));

        let vectors = client
            .encode_batch(&[
                "Quadcast HyperX condenser mic".to_string(),
                "Stainless steel chef knife".to_string(),
            ])
            .await
            .expect("Failed to generate embeddings");

        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.len() == 1536));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let client = EmbeddingClient::new(&EmbeddingSettings {
            api_key: "unused".to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
            model: "m".to_string(),
            dimension: 3,
        });
        assert!(client.encode_batch(&[]).await.unwrap().is_empty());
    }
}
