//! spawngate - HTTP/SSE gateway for LLM tool calling
//!
//! A reasoning model drives a bounded tool-call loop; every step is streamed
//! back to the client as server-sent events.
//!
//! # Modules
//!
//! - `agent` - conversation orchestrator and its event stream
//! - `artifact` - artifact schema, validator, builder and registry
//! - `llm` - chat-completions client and embedding adapter
//! - `vector` - SQLite document store with cosine search
//! - `tools` - tool catalog and dispatcher (shell, files, git, search, services)
//! - `server` - axum router and SSE transport
//! - `config`, `error`, `metrics`, `tracing`, `logbuf` - ambient plumbing
//!
//! # Quick Start
//!
//! ```ignore
//! use spawngate::{server, GatewayConfig};
//!
//! let config = GatewayConfig::from_env();
//! let router = server::create_router(state);
//! axum::serve(listener, router).await?;
//! ```

pub mod agent;
pub mod artifact;
pub mod config;
pub mod error;
pub mod llm;
pub mod logbuf;
pub mod metrics;
pub mod server;
pub mod tools;
pub mod tracing;
pub mod vector;

// Re-export commonly used types at crate root for convenience
pub use agent::{ChatEvent, Orchestrator, OrchestratorConfig};
pub use config::GatewayConfig;
pub use error::{DispatchError, GatewayError};
pub use server::{create_router, AppState};
