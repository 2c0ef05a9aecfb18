//! Events emitted while a chat request runs

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A model call is about to start
    Thinking { iteration: usize },
    ToolStart { tool: String, args: Value },
    ToolResult { tool: String, result: Value },
    /// A tool result carried an artifact
    Artifact { artifact: Value },
    /// Final assistant answer
    Response { content: String },
    Done {
        iterations: usize,
        #[serde(
            rename = "maxReached",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        max_reached: Option<bool>,
    },
    Error { message: String },
}

impl ChatEvent {
    /// SSE event name; matches the `type` tag
    pub fn name(&self) -> &'static str {
        match self {
            ChatEvent::Thinking { .. } => "thinking",
            ChatEvent::ToolStart { .. } => "tool_start",
            ChatEvent::ToolResult { .. } => "tool_result",
            ChatEvent::Artifact { .. } => "artifact",
            ChatEvent::Response { .. } => "response",
            ChatEvent::Done { .. } => "done",
            ChatEvent::Error { .. } => "error",
        }
    }

    /// `done` and `error` end a stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::Done { .. } | ChatEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let thinking = serde_json::to_value(ChatEvent::Thinking { iteration: 2 }).unwrap();
        assert_eq!(thinking, json!({"type": "thinking", "iteration": 2}));

        let done = serde_json::to_value(ChatEvent::Done {
            iterations: 10,
            max_reached: Some(true),
        })
        .unwrap();
        assert_eq!(done, json!({"type": "done", "iterations": 10, "maxReached": true}));

        let plain_done = serde_json::to_value(ChatEvent::Done {
            iterations: 1,
            max_reached: None,
        })
        .unwrap();
        assert!(plain_done.get("maxReached").is_none());
    }

    #[test]
    fn test_name_matches_tag() {
        let events = [
            ChatEvent::ToolStart { tool: "t".into(), args: json!({}) },
            ChatEvent::ToolResult { tool: "t".into(), result: json!({}) },
            ChatEvent::Artifact { artifact: json!({}) },
            ChatEvent::Response { content: String::new() },
            ChatEvent::Error { message: String::new() },
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.name());
        }
    }
}
