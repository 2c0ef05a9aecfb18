//! Chat completions with tool calling
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint (OpenRouter,
//! OpenAI, or a local proxy). The orchestrator only sees the
//! `ReasoningBackend` trait so tests can script replies.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::ReasoningConfig;
use crate::tools::CODE_INTERPRETER;

/// A message in a chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String, // "system", "user", "assistant", "tool"
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn with_role(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role("assistant", content)
    }

    /// Assistant turn that requests tool calls
    pub fn assistant_with_tools(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: "assistant".to_string(),
            content,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// Tool result keyed by the originating call id
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Tool calls carried by this message, empty when none
    pub fn requested_tools(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or(&[])
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// A tool call from the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    /// Absent on provider-executed calls such as `code_interpreter`
    #[serde(default)]
    pub function: FunctionCall,
}

fn default_call_type() -> String {
    "function".to_string()
}


impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            call_type: default_call_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// True for calls the provider runs server-side
    ///
    /// Keyed on the call type; a function named `code_interpreter` counts too.
    pub fn is_code_interpreter(&self) -> bool {
        self.call_type == CODE_INTERPRETER || self.function.name == CODE_INTERPRETER
    }

    /// Function name, falling back to the call type when none was sent
    pub fn tool_name(&self) -> &str {
        if self.function.name.is_empty() {
            &self.call_type
        } else {
            &self.function.name
        }
    }
}

/// Function call details
///
/// `arguments` stays a raw JSON string until the dispatcher parses it.
/// Backends that send an object instead get it re-serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "arguments_as_string")]
    pub arguments: String,
}

fn arguments_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(raw) => raw,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Tool definition for the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String, // Always "function"
    pub function: ToolFunction,
}

/// Function specification for a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value, // JSON Schema
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: ToolFunction {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

/// Error type for chat operations
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Reasoning backend is not configured: {0}")]
    Configuration(String),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Reasoning backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Empty response from reasoning backend")]
    EmptyResponse,
}

/// Anything that can produce the next assistant turn
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage, ChatError>;

    /// Model identifier, used for metric labels
    fn model(&self) -> &str;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint
#[derive(Clone)]
pub struct OpenAiChatClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl OpenAiChatClient {
    /// Create a new chat client
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &ReasoningConfig) -> Self {
        Self::new(
            config.resolved_base_url(),
            config.api_key.clone(),
            config.resolved_model(),
        )
    }
}

#[async_trait]
impl ReasoningBackend for OpenAiChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage, ChatError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ChatError::Configuration("set OPENROUTER_API_KEY or OPENAI_API_KEY".to_string())
        })?;

        let endpoint = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        if !tools.is_empty() {
            body["tools"] = serde_json::to_value(tools)?;
            body["tool_choice"] = serde_json::json!("auto");
        }

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ChatError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.is_empty() {
            return Err(ChatError::EmptyResponse);
        }

        let completion: CompletionResponse = serde_json::from_str(&text)?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(ChatError::EmptyResponse)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_call_deserializes_with_defaults() {
        let call: ToolCall =
            serde_json::from_str(r#"{"function":{"name":"read_file"}}"#).unwrap();
        assert_eq!(call.call_type, "function");
        assert_eq!(call.function.arguments, "");
        assert_eq!(call.id, "");
    }

    #[test]
    fn test_object_arguments_are_accepted() {
        let call: ToolCall = serde_json::from_str(
            r#"{"id":"c1","function":{"name":"read_file","arguments":{"path":"a.txt"}}}"#,
        )
        .unwrap();
        let parsed: Value = serde_json::from_str(&call.function.arguments).unwrap();
        assert_eq!(parsed, serde_json::json!({"path": "a.txt"}));

        let null_args: ToolCall =
            serde_json::from_str(r#"{"function":{"name":"list_files","arguments":null}}"#).unwrap();
        assert_eq!(null_args.function.arguments, "");
    }

    #[test]
    fn test_typed_code_interpreter_call_parses() {
        let msg: ChatMessage = serde_json::from_str(
            r#"{"role":"assistant","content":null,"tool_calls":[{"id":"ci_1","type":"code_interpreter","code_interpreter":{"input":"print(1)"}}]}"#,
        )
        .unwrap();
        let call = &msg.requested_tools()[0];
        assert!(call.is_code_interpreter());
        assert_eq!(call.tool_name(), "code_interpreter");
        assert!(!ToolCall::new("c2", "read_file", "{}").is_code_interpreter());
    }

    #[test]
    fn test_tool_message_carries_call_id() {
        let msg = ChatMessage::tool("call_1", "{\"success\":true}");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_1");
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn test_assistant_null_content_parses() {
        let msg: ChatMessage = serde_json::from_str(
            r#"{"role":"assistant","content":null,"tool_calls":[{"id":"c1","type":"function","function":{"name":"list_files","arguments":"{}"}}]}"#,
        )
        .unwrap();
        assert!(msg.content.is_none());
        assert_eq!(msg.requested_tools().len(), 1);
        assert_eq!(msg.text(), "");
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let client = OpenAiChatClient::new("http://127.0.0.1:9", None, "m");
        let err = client.complete(&[ChatMessage::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, ChatError::Configuration(_)));
    }
}
