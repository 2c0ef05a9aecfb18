//! Agent module for LLM-driven tool use
//!
//! # Architecture
//!
//! ```text
//! POST /api/chat/stream → Orchestrator::run
//!                  ↓
//!           ReasoningBackend::complete (with tool catalog)
//!                  ↓
//!           tool calls? ── yes → ToolExecutor::execute (sequential)
//!                  │                    ↓
//!                  │            tool messages appended → next iteration
//!                  no
//!                  ↓
//!           response → done
//! ```

pub mod events;
pub mod orchestrator;
pub mod prompt;

pub use events::ChatEvent;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use prompt::DEFAULT_SYSTEM_PROMPT;
