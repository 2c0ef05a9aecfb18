//! Tool dispatcher
//!
//! `execute` never fails: every problem (unknown tool, bad arguments, tool
//! failure) is folded into `{success: false, error}` so the model can read
//! it and recover.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, info_span, warn, Instrument};

use super::args::ToolRequest;
use super::catalog::{is_known_tool, tool_definitions};
use super::remote::CollaboratorClient;
use super::shell::{run_shell, SHELL_TIMEOUT};
use super::workspace::Workspace;
use super::{fs, git, search};
use crate::artifact::{build_artifact, ArtifactRegistry};
use crate::error::DispatchError;
use crate::llm::chat::ToolDefinition;
use crate::metrics::{TOOL_CALLS, TOOL_DURATION};
use crate::vector::{SearchOptions, VectorStore};

const PREVIEW_CHARS: usize = 100;

/// Something that can run tools by name
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, name: &str, args: Value) -> Value;

    fn definitions(&self) -> &[ToolDefinition] {
        tool_definitions()
    }
}

/// Render a dispatch failure the way the model sees it
pub fn failure(error: &DispatchError) -> Value {
    json!({"success": false, "error": error.to_string()})
}

/// Dispatches catalog tools against the workspace, stores and services
#[derive(Clone)]
pub struct ToolDispatcher {
    workspace: Workspace,
    artifacts: Arc<ArtifactRegistry>,
    vectors: VectorStore,
    remote: CollaboratorClient,
}

impl ToolDispatcher {
    pub fn new(
        workspace: Workspace,
        artifacts: Arc<ArtifactRegistry>,
        vectors: VectorStore,
        remote: CollaboratorClient,
    ) -> Self {
        Self {
            workspace,
            artifacts,
            vectors,
            remote,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    async fn run(&self, request: ToolRequest) -> Result<Value, DispatchError> {
        let ws = &self.workspace;
        match request {
            ToolRequest::ExecuteCommand { command, cwd } => {
                let dir = ws.resolve(cwd.as_deref().unwrap_or("."))?;
                let out = run_shell(&command, &dir, SHELL_TIMEOUT)
                    .await
                    .map_err(|e| DispatchError::Failed(format!("Failed to spawn command: {}", e)))?;
                let mut value = serde_json::to_value(&out)
                    .map_err(|e| DispatchError::Failed(e.to_string()))?;
                if !out.success {
                    value["error"] = json!(match out.code {
                        Some(code) => format!("Command exited with code {}", code),
                        None => "Command did not exit normally".to_string(),
                    });
                }
                Ok(value)
            }
            ToolRequest::ReadFile { path } => fs::read_file(ws, &path).await,
            ToolRequest::WriteFile { path, content } => fs::write_file(ws, &path, &content).await,
            ToolRequest::ListFiles { path, recursive } => {
                fs::list_files(ws, path.as_deref(), recursive).await
            }
            ToolRequest::GitClone {
                repo,
                directory,
                branch,
            } => git::git_clone(ws, &repo, directory.as_deref(), branch.as_deref()).await,
            ToolRequest::AnalyzeRepo { path } => git::analyze_repo(ws, path.as_deref()).await,
            ToolRequest::SearchCode {
                pattern,
                path,
                context_lines,
                file_type,
            } => {
                search::search_code(ws, &pattern, path.as_deref(), context_lines, file_type.as_deref())
                    .await
            }
            ToolRequest::CreateArtifact(input) => {
                let artifact = build_artifact(input);
                let summary = format!(
                    "Artifact '{}' created with status {} (score {})",
                    artifact.title().unwrap_or_default(),
                    artifact.status.as_str(),
                    artifact.validation.score
                );
                let value = artifact.to_value();
                self.artifacts.insert(artifact);
                Ok(json!({"success": true, "message": summary, "artifact": value}))
            }
            ToolRequest::EditorOpen { path } => {
                let full = ws.resolve(&path)?;
                self.remote.editor_open(&full.to_string_lossy()).await
            }
            ToolRequest::EditorSave { buffer_id, content } => {
                self.remote.editor_save(&buffer_id, content.as_deref()).await
            }
            ToolRequest::TerminalCreate { name, cwd, shell } => {
                let cwd = match cwd {
                    Some(dir) => Some(ws.resolve(&dir)?.to_string_lossy().to_string()),
                    None => Some(ws.root().to_string_lossy().to_string()),
                };
                let name = name.unwrap_or_else(|| "agent".to_string());
                self.remote
                    .terminal_create(&name, cwd.as_deref(), shell.as_deref())
                    .await
            }
            ToolRequest::TerminalExec {
                terminal_id,
                command,
                wait,
                timeout_ms,
            } => {
                self.remote
                    .terminal_exec(&terminal_id, &command, wait, timeout_ms)
                    .await
            }
            ToolRequest::TerminalBuffer { terminal_id, lines } => {
                self.remote.terminal_buffer(&terminal_id, lines).await
            }
            ToolRequest::TerminalList {} => self.remote.terminal_list().await,
            ToolRequest::MissionCreate { goal, context } => {
                self.remote.mission_create(&goal, context).await
            }
            ToolRequest::MissionList {} => self.remote.mission_list().await,
            ToolRequest::ServiceStatus {} => Ok(self.remote.service_status().await),
            ToolRequest::SemanticSearch {
                query,
                limit,
                collection,
                threshold,
            } => {
                let defaults = SearchOptions::default();
                let options = SearchOptions {
                    limit: limit.unwrap_or(defaults.limit),
                    collection,
                    threshold: threshold.unwrap_or(defaults.threshold),
                };
                let hits = self
                    .vectors
                    .search(&query, options)
                    .await
                    .map_err(|e| DispatchError::Failed(format!("Semantic search failed: {}", e)))?;
                Ok(json!({
                    "success": true,
                    "query": query,
                    "count": hits.len(),
                    "results": hits,
                }))
            }
            ToolRequest::StoreKnowledge {
                content,
                metadata,
                collection,
            } => {
                let metadata = metadata.unwrap_or_else(|| json!({}));
                let id = self
                    .vectors
                    .store(&content, metadata, collection.as_deref())
                    .await
                    .map_err(|e| DispatchError::Failed(format!("Failed to store knowledge: {}", e)))?;
                Ok(json!({
                    "success": true,
                    "id": id,
                    "collection": collection.as_deref().unwrap_or(crate::vector::DEFAULT_COLLECTION),
                    "preview": preview(&content),
                }))
            }
            ToolRequest::ListKnowledgeCollections {} => {
                let collections = self
                    .vectors
                    .list_collections()
                    .await
                    .map_err(|e| DispatchError::Failed(format!("Failed to list collections: {}", e)))?;
                Ok(json!({
                    "success": true,
                    "count": collections.len(),
                    "collections": collections,
                }))
            }
        }
    }
}

/// First 100 characters, with an ellipsis when cut
fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}

#[async_trait]
impl ToolExecutor for ToolDispatcher {
    async fn execute(&self, name: &str, args: Value) -> Value {
        let start = Instant::now();
        let span = info_span!("tool_call", tool = %name, otel.name = "tool_call");

        let result = async {
            if !is_known_tool(name) {
                return Err(DispatchError::UnknownTool(name.to_string()));
            }
            let request = ToolRequest::parse(name, args)?;
            self.run(request).await
        }
        .instrument(span)
        .await;

        let elapsed = start.elapsed().as_secs_f64();
        TOOL_DURATION.with_label_values(&[name]).observe(elapsed);

        match result {
            Ok(value) => {
                let ok = value.get("success").and_then(Value::as_bool).unwrap_or(true);
                let outcome = if ok { "success" } else { "error" };
                TOOL_CALLS.with_label_values(&[name, outcome]).inc();
                info!(tool = %name, outcome, duration_ms = elapsed * 1000.0, "Tool finished");
                value
            }
            Err(e) => {
                TOOL_CALLS.with_label_values(&[name, "error"]).inc();
                warn!(tool = %name, error = %e, "Tool failed");
                failure(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview() {
        assert_eq!(preview("short"), "short");
        let long = "a".repeat(150);
        let p = preview(&long);
        assert_eq!(p.len(), 103);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn test_failure_shape() {
        let v = failure(&DispatchError::UnknownTool("fly".into()));
        assert_eq!(v, json!({"success": false, "error": "Unknown tool: fly"}));
    }
}
