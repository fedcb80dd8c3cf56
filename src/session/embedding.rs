//! Embedding backend used by the session index.

use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::SessionConfig;
use crate::error::EmbeddingError;

/// Inputs per embeddings request
const EMBED_BATCH_SIZE: usize = 64;

/// Turns text into vectors.
pub trait Embedder {
    /// One vector per input, in input order
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn model_name(&self) -> &str;

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::ResponseParse("empty embedding response".to_string()))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Blocking client for OpenAI-compatible `/embeddings` endpoints.
pub struct OpenAiEmbedder {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiEmbedder {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Result<Self, EmbeddingError> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// `None` when no API key is configured
    pub fn from_config(config: &SessionConfig) -> Option<Result<Self, EmbeddingError>> {
        let api_key = config.resolved_api_key()?;
        Some(Self::new(&config.embedding_base_url, &config.embedding_model, api_key))
    }

    fn request(&self, input: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);
        debug!("POST {} ({} inputs, model {})", url, input.len(), self.model);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input,
            })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .map_err(|e| EmbeddingError::ResponseParse(e.to_string()))?;
        if parsed.data.len() != input.len() {
            return Err(EmbeddingError::ResponseParse(format!(
                "expected {} embeddings, got {}",
                input.len(),
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(EMBED_BATCH_SIZE) {
            vectors.extend(self.request(chunk)?);
        }
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
