//! Error taxonomy for the gateway
//!
//! Each subsystem owns a focused error enum. `GatewayError` is the crate-level
//! type that HTTP handlers return; it renders as `{success: false, error}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::llm::chat::ChatError;
use crate::llm::embeddings::EmbeddingError;
use crate::vector::StoreError;

/// Crate-level error type
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Tool execution failure
    #[error("{0}")]
    Dispatch(#[from] DispatchError),

    /// Reasoning, embedding or collaborator service failure
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Missing credential or unusable setting
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure inside a single tool invocation.
///
/// These never escape the dispatcher; they are rendered into a
/// `{success: false, error}` result and fed back to the model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Path '{0}' resolves outside the workspace")]
    OutsideWorkspace(String),

    #[error("{0}")]
    Failed(String),
}

impl From<EmbeddingError> for GatewayError {
    fn from(e: EmbeddingError) -> Self {
        match e {
            EmbeddingError::Configuration(msg) => GatewayError::Configuration(msg),
            other => GatewayError::Upstream(other.to_string()),
        }
    }
}

impl From<ChatError> for GatewayError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::Configuration(msg) => GatewayError::Configuration(msg),
            other => GatewayError::Upstream(other.to_string()),
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Embedding(inner) => inner.into(),
            StoreError::NotFound(id) => GatewayError::NotFound(format!("document {}", id)),
            other => GatewayError::Storage(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::BadRequest(e.to_string())
    }
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            GatewayError::Dispatch(_) | GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Configuration(_)
            | GatewayError::Storage(_)
            | GatewayError::Io(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
