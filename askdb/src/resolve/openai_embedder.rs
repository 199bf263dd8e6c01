//! OpenAI Embeddings implementation of [`Embedder`].
//!
//! Requires `OPENAI_API_KEY` (or a custom config). Any OpenAI-compatible
//! embeddings endpoint works as long as the dimension is known.

use async_openai::{
    config::OpenAIConfig,
    types::embeddings::{CreateEmbeddingRequest, EmbeddingInput},
    Client,
};
use async_trait::async_trait;

use crate::resolve::{Embedder, ResolveError};

/// OpenAI Embeddings client. Default model dimension table covers the
/// `text-embedding-3-*` and `ada-002` families; others need [`OpenAIEmbedder::with_dimension`].
pub struct OpenAIEmbedder {
    config: OpenAIConfig,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Creates an embedder for `model`, API key from `OPENAI_API_KEY`.
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_config(OpenAIConfig::new(), model)
    }

    /// Creates an embedder with a custom configuration (API key, base URL).
    pub fn with_config(config: OpenAIConfig, model: impl Into<String>) -> Self {
        let model = model.into();
        let dimensions = Self::get_model_dimensions(&model);
        Self {
            config,
            model,
            dimensions,
        }
    }

    /// Overrides the vector dimension (for non-OpenAI models behind a compatible API).
    pub fn with_dimension(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    fn get_model_dimensions(model: &str) -> usize {
        match model {
            "text-embedding-3-large" => 3072,
            "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
            _ => 1536,
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ResolveError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let inputs: Vec<String> = texts.iter().map(|&s| s.to_string()).collect();
        let input = if inputs.len() == 1 {
            EmbeddingInput::String(inputs[0].clone())
        } else {
            EmbeddingInput::StringArray(inputs)
        };
        let request = CreateEmbeddingRequest {
            input,
            model: self.model.clone(),
            ..Default::default()
        };

        let client = Client::with_config(self.config.clone());
        let response = client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| ResolveError::Embedding(format!("OpenAI API error: {}", e)))?;

        let mut data = response.data;
        data.sort_by_key(|e| e.index);
        let vectors: Vec<Vec<f32>> = data.into_iter().map(|e| e.embedding).collect();
        if vectors.len() != texts.len() {
            return Err(ResolveError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimensions
    }
}
