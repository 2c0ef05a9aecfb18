//! Outbound model clients
//!
//! - `chat` - OpenAI-compatible chat completions with tool calling
//! - `embeddings` - local-first embedding provider with remote fallback

pub mod chat;
pub mod embeddings;

pub use chat::{
    ChatError, ChatMessage, FunctionCall, OpenAiChatClient, ReasoningBackend, ToolCall,
    ToolDefinition, ToolFunction,
};
pub use embeddings::{Embedder, EmbeddingBatch, EmbeddingError, EmbeddingProvider};
