//! Embedding provider adapter
//!
//! Tries the local (Ollama-compatible) embedding service first, one request
//! per input. Any local failure falls back to a remote OpenAI-compatible API,
//! picked by API-key prefix, with a single batched request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{EmbeddingConfig, OPENROUTER_KEY_PREFIX};
use crate::metrics::EMBEDDING_REQUESTS;

/// Vectors for a batch of inputs, in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingBatch {
    pub vectors: Vec<Vec<f32>>,
    pub model: String,
    pub dimension: usize,
}

impl EmbeddingBatch {
    fn new(vectors: Vec<Vec<f32>>, model: impl Into<String>) -> Self {
        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        Self {
            vectors,
            model: model.into(),
            dimension,
        }
    }
}

#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// No remote credential to fall back to
    #[error("Embedding fallback is not configured: {0}")]
    Configuration(String),

    #[error("Embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Embedding API returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Malformed embedding response: {0}")]
    Malformed(String),
}

/// Turns text into vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, inputs: &[String]) -> Result<EmbeddingBatch, EmbeddingError>;

    async fn embed_one(&self, input: &str) -> Result<Vec<f32>, EmbeddingError> {
        let batch = self.embed(&[input.to_string()]).await?;
        batch
            .vectors
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Malformed("no vector returned".to_string()))
    }
}

/// Remote vendor chosen from the key prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteVendor {
    OpenRouter,
    OpenAi,
}

impl RemoteVendor {
    pub fn for_key(key: &str) -> Self {
        if key.starts_with(OPENROUTER_KEY_PREFIX) {
            RemoteVendor::OpenRouter
        } else {
            RemoteVendor::OpenAi
        }
    }

    fn label(self) -> &'static str {
        match self {
            RemoteVendor::OpenRouter => "openrouter",
            RemoteVendor::OpenAi => "openai",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            RemoteVendor::OpenRouter => "openai/text-embedding-3-small",
            RemoteVendor::OpenAi => "text-embedding-3-small",
        }
    }
}

/// Local-first embedding provider
#[derive(Clone)]
pub struct EmbeddingProvider {
    config: EmbeddingConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct RemoteResponse {
    #[serde(default)]
    data: Vec<RemoteItem>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct RemoteItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingProvider {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Embed via the local service, one call per input
    async fn embed_local(&self, base_url: &str, inputs: &[String]) -> Result<EmbeddingBatch, EmbeddingError> {
        let endpoint = format!("{}/api/embeddings", base_url.trim_end_matches('/'));
        let mut vectors = Vec::with_capacity(inputs.len());

        for input in inputs {
            let response = self
                .client
                .post(&endpoint)
                .json(&serde_json::json!({
                    "model": self.config.local_model,
                    "prompt": input,
                }))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(EmbeddingError::Upstream {
                    status: status.as_u16(),
                    body,
                });
            }

            let value: serde_json::Value = response.json().await?;
            vectors.push(extract_local_vector(&value)?);
        }

        Ok(EmbeddingBatch::new(vectors, self.config.local_model.clone()))
    }

    /// Embed via the remote vendor in one batched call
    async fn embed_remote(&self, inputs: &[String]) -> Result<EmbeddingBatch, EmbeddingError> {
        let key = self.config.api_key.as_deref().ok_or_else(|| {
            EmbeddingError::Configuration(
                "local embeddings unavailable and no EMBEDDING_API_KEY/OPENROUTER_API_KEY/OPENAI_API_KEY set"
                    .to_string(),
            )
        })?;

        let vendor = RemoteVendor::for_key(key);
        let base_url = match vendor {
            RemoteVendor::OpenRouter => &self.config.openrouter_base_url,
            RemoteVendor::OpenAi => &self.config.openai_base_url,
        };
        let model = self
            .config
            .remote_model
            .clone()
            .unwrap_or_else(|| vendor.default_model().to_string());

        let response = self
            .client
            .post(format!("{}/embeddings", base_url.trim_end_matches('/')))
            .bearer_auth(key)
            .json(&serde_json::json!({
                "model": model,
                "input": inputs,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            EMBEDDING_REQUESTS
                .with_label_values(&[vendor.label(), "error"])
                .inc();
            return Err(EmbeddingError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let mut parsed: RemoteResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Malformed(e.to_string()))?;

        if parsed.data.len() != inputs.len() {
            return Err(EmbeddingError::Malformed(format!(
                "expected {} vectors, got {}",
                inputs.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|item| item.index);
        let vectors = parsed.data.into_iter().map(|item| item.embedding).collect();

        EMBEDDING_REQUESTS
            .with_label_values(&[vendor.label(), "success"])
            .inc();

        Ok(EmbeddingBatch::new(vectors, parsed.model.unwrap_or(model)))
    }
}

#[async_trait]
impl Embedder for EmbeddingProvider {
    async fn embed(&self, inputs: &[String]) -> Result<EmbeddingBatch, EmbeddingError> {
        if inputs.is_empty() {
            return Ok(EmbeddingBatch::new(Vec::new(), self.config.local_model.clone()));
        }

        if let Some(local_url) = &self.config.local_url {
            match self.embed_local(local_url, inputs).await {
                Ok(batch) => {
                    EMBEDDING_REQUESTS.with_label_values(&["local", "success"]).inc();
                    debug!(count = inputs.len(), dimension = batch.dimension, "Embedded locally");
                    return Ok(batch);
                }
                Err(e) => {
                    EMBEDDING_REQUESTS.with_label_values(&["local", "error"]).inc();
                    warn!(error = %e, "Local embedding failed, falling back to remote");
                }
            }
        }

        self.embed_remote(inputs).await
    }
}

/// Accepts `{embedding: [...]}`, `{embeddings: [[...]]}` and `{data: [{embedding}]}`
fn extract_local_vector(value: &serde_json::Value) -> Result<Vec<f32>, EmbeddingError> {
    let candidate = value
        .get("embedding")
        .or_else(|| value.get("embeddings").and_then(|e| e.get(0)))
        .or_else(|| {
            value
                .get("data")
                .and_then(|d| d.get(0))
                .and_then(|d| d.get("embedding"))
        })
        .ok_or_else(|| EmbeddingError::Malformed("no embedding field in response".to_string()))?;

    let vector: Vec<f32> = serde_json::from_value(candidate.clone())
        .map_err(|e| EmbeddingError::Malformed(e.to_string()))?;

    if vector.is_empty() {
        return Err(EmbeddingError::Malformed("empty embedding".to_string()));
    }
    Ok(vector)
}

/// Rough token estimate used for usage reporting: ceil(chars / 4) per input
pub fn estimate_tokens(inputs: &[String]) -> usize {
    inputs
        .iter()
        .map(|text| text.chars().count().div_ceil(4))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_from_key_prefix() {
        assert_eq!(RemoteVendor::for_key("sk-or-v1-xyz"), RemoteVendor::OpenRouter);
        assert_eq!(RemoteVendor::for_key("sk-abc"), RemoteVendor::OpenAi);
    }

    #[test]
    fn test_extract_local_shapes() {
        let a = serde_json::json!({"embedding": [0.1, 0.2]});
        let b = serde_json::json!({"embeddings": [[0.3, 0.4]]});
        let c = serde_json::json!({"data": [{"embedding": [0.5]}]});
        assert_eq!(extract_local_vector(&a).unwrap(), vec![0.1, 0.2]);
        assert_eq!(extract_local_vector(&b).unwrap(), vec![0.3, 0.4]);
        assert_eq!(extract_local_vector(&c).unwrap(), vec![0.5]);
        assert!(extract_local_vector(&serde_json::json!({"ok": true})).is_err());
    }

    #[test]
    fn test_estimate_tokens() {
        let inputs = vec!["abcd".to_string(), "abcde".to_string(), String::new()];
        assert_eq!(estimate_tokens(&inputs), 1 + 2);
    }

    #[tokio::test]
    async fn test_no_local_and_no_key_is_configuration_error() {
        let provider = EmbeddingProvider::new(EmbeddingConfig {
            local_url: None,
            api_key: None,
            ..Default::default()
        });
        let err = provider.embed(&["hello".to_string()]).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Configuration(_)));
    }
}
