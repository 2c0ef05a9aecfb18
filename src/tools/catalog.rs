//! The tool catalog advertised to the reasoning backend
//!
//! Schemas are descriptive only; argument checking happens when the call is
//! parsed into a `ToolRequest`.

use lazy_static::lazy_static;
use serde_json::json;

use crate::llm::chat::ToolDefinition;

/// Tool the reasoning provider runs itself; acknowledged, never dispatched
pub const CODE_INTERPRETER: &str = "code_interpreter";

lazy_static! {
    static ref CATALOG: Vec<ToolDefinition> = build_catalog();
}

/// All tool definitions, built once
pub fn tool_definitions() -> &'static [ToolDefinition] {
    CATALOG.as_slice()
}

pub fn is_known_tool(name: &str) -> bool {
    CATALOG.iter().any(|t| t.name() == name)
}

fn build_catalog() -> Vec<ToolDefinition> {
    vec![
        // ── Shell & filesystem ───────────────────────────────────────────────
        ToolDefinition::function(
            "execute_command",
            "Run a shell command in the workspace and return stdout, stderr and the exit code. Output is truncated to 10,000 characters per stream; commands are killed after 60 seconds.",
            json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string", "description": "Shell command to run with sh -c"},
                    "cwd": {"type": "string", "description": "Working directory relative to the workspace root"}
                },
                "required": ["command"]
            }),
        ),
        ToolDefinition::function(
            "read_file",
            "Read a text file from the workspace. Content beyond 50,000 characters is truncated.",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "File path relative to the workspace root"}
                },
                "required": ["path"]
            }),
        ),
        ToolDefinition::function(
            "write_file",
            "Create or overwrite a file in the workspace, creating parent directories as needed.",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "File path relative to the workspace root"},
                    "content": {"type": "string", "description": "Full file content"}
                },
                "required": ["path", "content"]
            }),
        ),
        ToolDefinition::function(
            "list_files",
            "List files and directories in the workspace.",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Directory relative to the workspace root (default: root)"},
                    "recursive": {"type": "boolean", "description": "Descend into subdirectories"}
                }
            }),
        ),
        // ── Git & code intelligence ──────────────────────────────────────────
        ToolDefinition::function(
            "git_clone",
            "Clone a git repository into the workspace. Accepts a full URL or GitHub owner/repo shorthand. Refuses to overwrite an existing directory.",
            json!({
                "type": "object",
                "properties": {
                    "repo": {"type": "string", "description": "Repository URL or owner/repo"},
                    "directory": {"type": "string", "description": "Target directory name (default: repository name)"},
                    "branch": {"type": "string", "description": "Branch or tag to check out"}
                },
                "required": ["repo"]
            }),
        ),
        ToolDefinition::function(
            "analyze_repo",
            "Summarize a directory: file tree (depth 3), file types, detected manifests, git remote and recent commits.",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Directory relative to the workspace root"}
                }
            }),
        ),
        ToolDefinition::function(
            "search_code",
            "Search file contents with a regular expression, returning matching lines with context and per-file match counts.",
            json!({
                "type": "object",
                "properties": {
                    "pattern": {"type": "string", "description": "Regular expression"},
                    "path": {"type": "string", "description": "Directory to search (default: workspace root)"},
                    "context_lines": {"type": "integer", "description": "Lines of context around each match (default 2)"},
                    "file_type": {"type": "string", "description": "Restrict to a file type or extension, e.g. rust, py"}
                },
                "required": ["pattern"]
            }),
        ),
        // ── Artifacts ────────────────────────────────────────────────────────
        ToolDefinition::function(
            "create_artifact",
            "Emit a structured artifact (code, app, document, diagram, ...) to the user. Provide files with path, language and content; mark one file as entrypoint.",
            json!({
                "type": "object",
                "properties": {
                    "type": {"type": "string", "description": "Artifact type, optionally with subtype, e.g. code, app:web, diagram:mermaid"},
                    "title": {"type": "string"},
                    "description": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "files": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "path": {"type": "string"},
                                "language": {"type": "string"},
                                "content": {"type": "string"},
                                "role": {"type": "string"},
                                "entrypoint": {"type": "boolean"}
                            },
                            "required": ["path", "content"]
                        }
                    },
                    "execution": {
                        "type": "object",
                        "properties": {
                            "runtime": {"type": "string"},
                            "command": {"type": "string"},
                            "args": {"type": "array", "items": {"type": "string"}},
                            "setup": {"type": "array", "items": {"type": "string"}},
                            "timeout": {"type": "number"}
                        }
                    },
                    "dependencies": {"type": "object"},
                    "env": {"type": "array", "items": {"type": "object"}},
                    "render": {"type": "object"}
                },
                "required": ["type", "title"]
            }),
        ),
        // ── Editor service ───────────────────────────────────────────────────
        ToolDefinition::function(
            "editor_open",
            "Open a workspace file in the editor service, returning its buffer.",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "File path relative to the workspace root"}
                },
                "required": ["path"]
            }),
        ),
        ToolDefinition::function(
            "editor_save",
            "Save an editor buffer, optionally replacing its content first.",
            json!({
                "type": "object",
                "properties": {
                    "buffer_id": {"type": "string"},
                    "content": {"type": "string", "description": "New buffer content"}
                },
                "required": ["buffer_id"]
            }),
        ),
        // ── Terminal service ─────────────────────────────────────────────────
        ToolDefinition::function(
            "terminal_create",
            "Create a persistent terminal session.",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "cwd": {"type": "string", "description": "Working directory relative to the workspace root"},
                    "shell": {"type": "string"}
                }
            }),
        ),
        ToolDefinition::function(
            "terminal_exec",
            "Send a command to a terminal session. With wait=true, block until output settles and return it.",
            json!({
                "type": "object",
                "properties": {
                    "terminal_id": {"type": "string"},
                    "command": {"type": "string"},
                    "wait": {"type": "boolean"},
                    "timeout_ms": {"type": "integer"}
                },
                "required": ["terminal_id", "command"]
            }),
        ),
        ToolDefinition::function(
            "terminal_buffer",
            "Read recent output lines from a terminal session.",
            json!({
                "type": "object",
                "properties": {
                    "terminal_id": {"type": "string"},
                    "lines": {"type": "integer"}
                },
                "required": ["terminal_id"]
            }),
        ),
        ToolDefinition::function(
            "terminal_list",
            "List active terminal sessions.",
            json!({"type": "object", "properties": {}}),
        ),
        // ── Missions ─────────────────────────────────────────────────────────
        ToolDefinition::function(
            "mission_create",
            "Start a long-running background mission toward a goal.",
            json!({
                "type": "object",
                "properties": {
                    "goal": {"type": "string"},
                    "context": {"type": "object"}
                },
                "required": ["goal"]
            }),
        ),
        ToolDefinition::function(
            "mission_list",
            "List missions and their status.",
            json!({"type": "object", "properties": {}}),
        ),
        ToolDefinition::function(
            "service_status",
            "Check whether the terminal, editor and mission services are reachable.",
            json!({"type": "object", "properties": {}}),
        ),
        // ── Knowledge ────────────────────────────────────────────────────────
        ToolDefinition::function(
            "semantic_search",
            "Search stored knowledge by meaning. Returns documents ranked by similarity.",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "limit": {"type": "integer", "description": "Maximum results (default 5)"},
                    "collection": {"type": "string"},
                    "threshold": {"type": "number", "description": "Minimum similarity 0-1 (default 0.7)"}
                },
                "required": ["query"]
            }),
        ),
        ToolDefinition::function(
            "store_knowledge",
            "Store a piece of text in the knowledge base for later semantic search.",
            json!({
                "type": "object",
                "properties": {
                    "content": {"type": "string"},
                    "metadata": {"type": "object"},
                    "collection": {"type": "string", "description": "Collection name (default: default)"}
                },
                "required": ["content"]
            }),
        ),
        ToolDefinition::function(
            "list_knowledge_collections",
            "List knowledge collections with document counts.",
            json!({"type": "object", "properties": {}}),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_unique() {
        let names: HashSet<&str> = tool_definitions().iter().map(|t| t.name()).collect();
        assert_eq!(names.len(), tool_definitions().len());
        assert_eq!(tool_definitions().len(), 20);
    }

    #[test]
    fn test_catalog_schemas_are_objects() {
        for tool in tool_definitions() {
            assert_eq!(tool.tool_type, "function");
            assert_eq!(tool.function.parameters["type"], "object", "{}", tool.name());
        }
    }

    #[test]
    fn test_code_interpreter_not_dispatchable() {
        assert!(!is_known_tool(CODE_INTERPRETER));
        assert!(is_known_tool("git_clone"));
    }
}
