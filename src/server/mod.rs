//! HTTP surface of the gateway
//!
//! # Architecture
//!
//! ```text
//! axum Router (CORS + request tracing)
//!   ├── /api/chat/stream          → Orchestrator → SSE
//!   ├── /api/sandbox/exec[/stream] → shell (process group) → JSON | SSE
//!   ├── /api/artifacts/*          → builder + registry
//!   ├── /api/vectors/*            → VectorStore (SQLite)
//!   ├── /api/embeddings           → Embedder
//!   └── /health /metrics /api/logs /api/tools
//! ```
//!
//! All process-scoped state lives in `AppState` and is injected into
//! handlers; nothing here is global except the metrics registry.

pub mod admin;
pub mod artifacts;
pub mod chat;
pub mod embeddings;
pub mod sandbox;
pub mod sse;
pub mod vectors;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::agent::Orchestrator;
use crate::artifact::ArtifactRegistry;
use crate::llm::Embedder;
use crate::logbuf::LogBuffer;
use crate::tools::Workspace;
use crate::vector::VectorStore;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub workspace: Workspace,
    pub artifacts: Arc<ArtifactRegistry>,
    pub vectors: VectorStore,
    pub embedder: Arc<dyn Embedder>,
    pub logs: Arc<LogBuffer>,
}

/// Build the full router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(admin::health))
        .route("/metrics", get(admin::metrics))
        .route("/api/logs", get(admin::list_logs).delete(admin::clear_logs))
        .route("/api/tools", get(admin::list_tools))
        .route("/api/chat/stream", post(chat::chat_stream))
        .route("/api/sandbox/exec", post(sandbox::exec))
        .route("/api/sandbox/exec/stream", post(sandbox::exec_stream))
        .route(
            "/api/artifacts",
            get(artifacts::list_artifacts).post(artifacts::create_artifact),
        )
        .route("/api/artifacts/validate", post(artifacts::validate_artifact))
        .route("/api/artifacts/stream", post(artifacts::stream_artifact))
        .route("/api/artifacts/schema/types", get(artifacts::schema_types))
        .route(
            "/api/artifacts/:id",
            get(artifacts::get_artifact)
                .patch(artifacts::patch_artifact)
                .delete(artifacts::delete_artifact),
        )
        .route("/api/vectors/store", post(vectors::store))
        .route("/api/vectors/store/batch", post(vectors::store_batch))
        .route("/api/vectors/search", post(vectors::search))
        .route("/api/vectors/collections", get(vectors::list_collections))
        .route(
            "/api/vectors/collections/:collection",
            delete(vectors::clear_collection),
        )
        .route("/api/vectors/:id", delete(vectors::delete_document))
        .route("/api/embeddings", post(embeddings::embed))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
