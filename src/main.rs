//! spawngate server binary
//!
//! # Usage
//! ```bash
//! spawngate [--host 0.0.0.0] [--port 3000] [--workspace ./workspace] [--db ./data/vectors.db]
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use spawngate::agent::{Orchestrator, OrchestratorConfig};
use spawngate::artifact::ArtifactRegistry;
use spawngate::config::GatewayConfig;
use spawngate::llm::{Embedder, EmbeddingProvider, OpenAiChatClient};
use spawngate::logbuf::LogBuffer;
use spawngate::server::{create_router, AppState};
use spawngate::tools::{CollaboratorClient, ToolDispatcher, Workspace};
use spawngate::tracing::{init_tracing, shutdown_tracing};
use spawngate::vector::VectorStore;

/// spawngate - LLM tool-call gateway with SSE streaming
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, env = "SPAWNGATE_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SPAWNGATE_PORT")]
    port: Option<u16>,

    /// Workspace root for every tool path
    #[arg(short, long, env = "WORKSPACE_ROOT")]
    workspace: Option<PathBuf>,

    /// SQLite database for the vector store
    #[arg(long, env = "VECTOR_DB_PATH")]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // .env is optional
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let mut config = GatewayConfig::from_env();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(workspace) = args.workspace {
        config.workspace_root = workspace;
    }
    if let Some(db) = args.db {
        config.database_path = db;
    }

    let logs = Arc::new(LogBuffer::new(config.log_buffer_capacity));
    init_tracing("spawngate", config.otlp_endpoint.as_deref(), logs.clone())?;

    let workspace = Workspace::new(&config.workspace_root)?;
    let embedder: Arc<dyn Embedder> = Arc::new(EmbeddingProvider::new(config.embeddings.clone()));
    let vectors = VectorStore::open(&config.database_path, embedder.clone())?;
    let artifacts = Arc::new(ArtifactRegistry::new());

    let dispatcher = ToolDispatcher::new(
        workspace.clone(),
        artifacts.clone(),
        vectors.clone(),
        CollaboratorClient::new(config.services.clone()),
    );
    let backend = OpenAiChatClient::from_config(&config.reasoning);
    let orchestrator = Orchestrator::new(
        Arc::new(backend),
        Arc::new(dispatcher),
        OrchestratorConfig::from(&config.reasoning),
    );

    info!(
        workspace = %workspace.root().display(),
        database = %config.database_path.display(),
        model = %config.reasoning.resolved_model(),
        reasoning_url = %config.reasoning.resolved_base_url(),
        "Gateway components ready"
    );
    if config.reasoning.api_key.is_none() {
        tracing::warn!("No reasoning API key configured; chat requests will fail until one is set");
    }

    let state = AppState {
        orchestrator,
        workspace,
        artifacts,
        vectors,
        embedder,
        logs,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(addr = %config.bind_addr(), "spawngate listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    shutdown_tracing();
    Ok(())
}
