//! Gateway configuration
//!
//! Every setting has a default; `GatewayConfig::from_env()` overlays the
//! process environment (after `.env` has been loaded by the binary).

use std::path::PathBuf;

/// Default OpenRouter API base
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
/// Default OpenAI API base
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// API keys with this prefix are routed to OpenRouter
pub const OPENROUTER_KEY_PREFIX: &str = "sk-or-";

/// Main gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Root directory every tool path is resolved against
    pub workspace_root: PathBuf,
    /// SQLite file backing the vector store
    pub database_path: PathBuf,
    pub reasoning: ReasoningConfig,
    pub embeddings: EmbeddingConfig,
    pub services: ServiceEndpoints,
    /// Capacity of the in-memory log ring buffer
    pub log_buffer_capacity: usize,
    /// OTLP collector endpoint; tracing export is disabled when unset
    pub otlp_endpoint: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            workspace_root: PathBuf::from("./workspace"),
            database_path: PathBuf::from("./data/vectors.db"),
            reasoning: ReasoningConfig::default(),
            embeddings: EmbeddingConfig::default(),
            services: ServiceEndpoints::default(),
            log_buffer_capacity: 1000,
            otlp_endpoint: None,
        }
    }
}

/// Settings for the reasoning (chat completion) backend
#[derive(Debug, Clone)]
pub struct ReasoningConfig {
    /// Explicit API base; derived from the key prefix when `None`
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Explicit model; derived from the provider when `None`
    pub model: Option<String>,
    /// Maximum number of model calls per chat request
    pub max_iterations: usize,
    /// Number of caller-supplied prior turns kept in context
    pub history_window: usize,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            model: None,
            max_iterations: 10,
            history_window: 10,
        }
    }
}

impl ReasoningConfig {
    /// API base to use, honouring the key-prefix convention
    pub fn resolved_base_url(&self) -> String {
        if let Some(url) = &self.base_url {
            return url.trim_end_matches('/').to_string();
        }
        match &self.api_key {
            Some(key) if !key.starts_with(OPENROUTER_KEY_PREFIX) => OPENAI_BASE_URL.to_string(),
            _ => OPENROUTER_BASE_URL.to_string(),
        }
    }

    /// Model to request
    pub fn resolved_model(&self) -> String {
        if let Some(model) = &self.model {
            return model.clone();
        }
        if self.resolved_base_url() == OPENAI_BASE_URL {
            "gpt-4o".to_string()
        } else {
            "anthropic/claude-sonnet-4".to_string()
        }
    }
}

/// Settings for the embedding adapter
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Local embedding service (Ollama-compatible); `None` skips straight to remote
    pub local_url: Option<String>,
    pub local_model: String,
    /// Credential for the remote fallback
    pub api_key: Option<String>,
    pub openrouter_base_url: String,
    pub openai_base_url: String,
    /// Remote model; defaults per vendor when `None`
    pub remote_model: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            local_url: Some("http://localhost:11434".to_string()),
            local_model: "nomic-embed-text".to_string(),
            api_key: None,
            openrouter_base_url: OPENROUTER_BASE_URL.to_string(),
            openai_base_url: OPENAI_BASE_URL.to_string(),
            remote_model: None,
        }
    }
}

/// Base URLs of the collaborator services
#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    pub terminal_url: String,
    pub editor_url: String,
    pub mission_url: String,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            terminal_url: "http://localhost:3001".to_string(),
            editor_url: "http://localhost:3001".to_string(),
            mission_url: "http://localhost:3002".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Build a configuration from defaults overlaid with environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = get("SPAWNGATE_HOST") {
            config.host = host;
        }
        if let Some(port) = get("SPAWNGATE_PORT").and_then(|p| p.parse().ok()) {
            config.port = port;
        }
        if let Some(root) = get("WORKSPACE_ROOT") {
            config.workspace_root = PathBuf::from(root);
        }
        if let Some(path) = get("VECTOR_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }

        config.reasoning.api_key = get("OPENROUTER_API_KEY").or_else(|| get("OPENAI_API_KEY"));
        config.reasoning.base_url = get("REASONING_BASE_URL");
        config.reasoning.model = get("REASONING_MODEL");
        if let Some(n) = get("MAX_ITERATIONS").and_then(|v| v.parse().ok()) {
            config.reasoning.max_iterations = n;
        }
        if let Some(n) = get("HISTORY_WINDOW").and_then(|v| v.parse().ok()) {
            config.reasoning.history_window = n;
        }

        match get("LOCAL_EMBEDDING_URL") {
            Some(url) if url == "off" => config.embeddings.local_url = None,
            Some(url) => config.embeddings.local_url = Some(url),
            None => {}
        }
        if let Some(model) = get("LOCAL_EMBEDDING_MODEL") {
            config.embeddings.local_model = model;
        }
        config.embeddings.api_key = get("EMBEDDING_API_KEY").or_else(|| config.reasoning.api_key.clone());
        config.embeddings.remote_model = get("REMOTE_EMBEDDING_MODEL");

        if let Some(url) = get("TERMINAL_SERVICE_URL") {
            config.services.terminal_url = url.clone();
            config.services.editor_url = url;
        }
        if let Some(url) = get("EDITOR_SERVICE_URL") {
            config.services.editor_url = url;
        }
        if let Some(url) = get("MISSION_SERVICE_URL") {
            config.services.mission_url = url;
        }

        if let Some(n) = get("LOG_BUFFER_CAPACITY").and_then(|v| v.parse().ok()) {
            config.log_buffer_capacity = n;
        }
        config.otlp_endpoint = get("OTLP_ENDPOINT");

        config
    }

    /// Address string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.reasoning.max_iterations, 10);
        assert_eq!(config.reasoning.history_window, 10);
        assert_eq!(config.log_buffer_capacity, 1000);
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn test_env_overlay() {
        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("SPAWNGATE_PORT", "8080"),
            ("WORKSPACE_ROOT", "/tmp/ws"),
            ("MAX_ITERATIONS", "4"),
            ("MISSION_SERVICE_URL", "http://missions:9000"),
        ]));
        assert_eq!(config.port, 8080);
        assert_eq!(config.workspace_root, PathBuf::from("/tmp/ws"));
        assert_eq!(config.reasoning.max_iterations, 4);
        assert_eq!(config.services.mission_url, "http://missions:9000");
    }

    #[test]
    fn test_key_prefix_selects_provider() {
        let openrouter = ReasoningConfig {
            api_key: Some("sk-or-v1-abc".into()),
            ..Default::default()
        };
        assert_eq!(openrouter.resolved_base_url(), OPENROUTER_BASE_URL);

        let openai = ReasoningConfig {
            api_key: Some("sk-proj-abc".into()),
            ..Default::default()
        };
        assert_eq!(openai.resolved_base_url(), OPENAI_BASE_URL);
        assert_eq!(openai.resolved_model(), "gpt-4o");
    }

    #[test]
    fn test_local_embeddings_can_be_disabled() {
        let config = GatewayConfig::from_lookup(lookup_from(&[("LOCAL_EMBEDDING_URL", "off")]));
        assert!(config.embeddings.local_url.is_none());
    }

    #[test]
    fn test_embedding_key_falls_back_to_reasoning_key() {
        let config = GatewayConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")]));
        assert_eq!(config.embeddings.api_key.as_deref(), Some("sk-test"));
    }
}
