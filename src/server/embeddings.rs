//! `POST /api/embeddings`

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use super::AppState;
use crate::error::{GatewayError, Result};
use crate::llm::embeddings::estimate_tokens;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    One(String),
    Many(Vec<String>),
}

impl EmbeddingInput {
    fn into_vec(self) -> Vec<String> {
        match self {
            EmbeddingInput::One(text) => vec![text],
            EmbeddingInput::Many(texts) => texts,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingRequest {
    pub input: EmbeddingInput,
    /// Accepted for OpenAI compatibility; the configured provider picks the model
    #[serde(default)]
    pub model: Option<String>,
}

pub async fn embed(
    State(state): State<AppState>,
    Json(request): Json<EmbeddingRequest>,
) -> Result<Json<Value>> {
    if let Some(model) = &request.model {
        tracing::debug!(requested = %model, "Ignoring requested embedding model");
    }
    let inputs = request.input.into_vec();
    if inputs.is_empty() {
        return Err(GatewayError::BadRequest("input is required".to_string()));
    }

    let batch = state.embedder.embed(&inputs).await?;
    let tokens = estimate_tokens(&inputs);

    Ok(Json(json!({
        "embeddings": batch.vectors,
        "model": batch.model,
        "usage": {
            "prompt_tokens": tokens,
            "total_tokens": tokens,
        },
        "dimensions": batch.dimension,
    })))
}
