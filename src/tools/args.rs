//! Typed tool arguments
//!
//! The model hands over a tool name and a JSON arguments string. At the
//! dispatcher boundary these become one `ToolRequest`, so every tool body
//! works with checked, typed fields.

use serde::Deserialize;
use serde_json::Value;

use crate::error::DispatchError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "tool", content = "args", rename_all = "snake_case")]
pub enum ToolRequest {
    ExecuteCommand {
        command: String,
        #[serde(default)]
        cwd: Option<String>,
    },
    ReadFile {
        path: String,
    },
    WriteFile {
        path: String,
        content: String,
    },
    ListFiles {
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        recursive: bool,
    },
    GitClone {
        #[serde(alias = "url")]
        repo: String,
        #[serde(default)]
        directory: Option<String>,
        #[serde(default)]
        branch: Option<String>,
    },
    AnalyzeRepo {
        #[serde(default)]
        path: Option<String>,
    },
    SearchCode {
        pattern: String,
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        context_lines: Option<usize>,
        #[serde(default)]
        file_type: Option<String>,
    },
    CreateArtifact(Value),
    EditorOpen {
        path: String,
    },
    EditorSave {
        buffer_id: String,
        #[serde(default)]
        content: Option<String>,
    },
    TerminalCreate {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        cwd: Option<String>,
        #[serde(default)]
        shell: Option<String>,
    },
    TerminalExec {
        terminal_id: String,
        command: String,
        #[serde(default)]
        wait: bool,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    TerminalBuffer {
        terminal_id: String,
        #[serde(default)]
        lines: Option<usize>,
    },
    TerminalList {},
    MissionCreate {
        goal: String,
        #[serde(default)]
        context: Option<Value>,
    },
    MissionList {},
    ServiceStatus {},
    SemanticSearch {
        query: String,
        #[serde(default)]
        limit: Option<usize>,
        #[serde(default)]
        collection: Option<String>,
        #[serde(default)]
        threshold: Option<f32>,
    },
    StoreKnowledge {
        content: String,
        #[serde(default)]
        metadata: Option<Value>,
        #[serde(default)]
        collection: Option<String>,
    },
    ListKnowledgeCollections {},
}

impl ToolRequest {
    /// Build a request from a tool name and its (already parsed) arguments
    ///
    /// The caller has checked the name against the catalog, so a failure here
    /// is always an argument problem.
    pub fn parse(name: &str, args: Value) -> Result<Self, DispatchError> {
        let args = match args {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        serde_json::from_value(serde_json::json!({ "tool": name, "args": args })).map_err(|e| {
            DispatchError::InvalidArguments {
                tool: name.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

/// Parse the raw arguments string a model sent; empty means `{}`
pub fn parse_raw_arguments(tool: &str, raw: &str) -> Result<Value, DispatchError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw).map_err(|e| DispatchError::InvalidArguments {
        tool: tool.to_string(),
        reason: format!("arguments are not valid JSON: {}", e),
    })
}
