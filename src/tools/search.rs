//! Code search over the workspace (ripgrep, falling back to grep)

use std::io::ErrorKind;
use std::path::Path;

use serde_json::{json, Value};
use tokio::process::Command;
use tracing::debug;

use super::workspace::Workspace;
use crate::error::DispatchError;

const MAX_EXCERPT_LINES: usize = 100;
const MAX_COUNTED_FILES: usize = 50;
const MAX_CONTEXT_LINES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Engine {
    Ripgrep,
    Grep,
}

impl Engine {
    fn program(self) -> &'static str {
        match self {
            Engine::Ripgrep => "rg",
            Engine::Grep => "grep",
        }
    }

    fn excerpt_args(self, pattern: &str, context: usize, file_type: Option<&str>, dir: &Path) -> Vec<String> {
        let mut args = match self {
            Engine::Ripgrep => vec!["--line-number".to_string(), "--no-heading".to_string()],
            Engine::Grep => vec![
                "-rn".to_string(),
                "-I".to_string(),
                "--exclude-dir=.git".to_string(),
                "--exclude-dir=node_modules".to_string(),
            ],
        };
        args.push(format!("--context={}", context));
        self.push_type(&mut args, file_type);
        args.push("-e".to_string());
        args.push(pattern.to_string());
        args.push(dir.to_string_lossy().to_string());
        args
    }

    fn count_args(self, pattern: &str, file_type: Option<&str>, dir: &Path) -> Vec<String> {
        let mut args = match self {
            Engine::Ripgrep => vec!["--count".to_string()],
            Engine::Grep => vec![
                "-rc".to_string(),
                "-I".to_string(),
                "--exclude-dir=.git".to_string(),
                "--exclude-dir=node_modules".to_string(),
            ],
        };
        self.push_type(&mut args, file_type);
        args.push("-e".to_string());
        args.push(pattern.to_string());
        args.push(dir.to_string_lossy().to_string());
        args
    }

    fn push_type(self, args: &mut Vec<String>, file_type: Option<&str>) {
        if let Some(t) = file_type.filter(|t| !t.is_empty()) {
            match self {
                Engine::Ripgrep => {
                    args.push("--type".to_string());
                    args.push(t.to_string());
                }
                Engine::Grep => args.push(format!("--include=*.{}", t.trim_start_matches('.'))),
            }
        }
    }
}

/// Run a search engine; exit status 1 is "no matches", not a failure
async fn run(engine: Engine, args: &[String], cwd: &Path) -> std::io::Result<Result<String, String>> {
    let output = Command::new(engine.program())
        .args(args)
        .current_dir(cwd)
        .output()
        .await?;

    match output.status.code() {
        Some(0) | Some(1) => Ok(Ok(String::from_utf8_lossy(&output.stdout).to_string())),
        _ => Ok(Err(String::from_utf8_lossy(&output.stderr).trim().to_string())),
    }
}

fn parse_counts(output: &str, ws: &Workspace) -> Vec<Value> {
    output
        .lines()
        .filter_map(|line| {
            let (file, count) = line.rsplit_once(':')?;
            let count: usize = count.trim().parse().ok()?;
            (count > 0).then(|| json!({"file": ws.relative(Path::new(file)), "matches": count}))
        })
        .take(MAX_COUNTED_FILES)
        .collect()
}

pub async fn search_code(
    ws: &Workspace,
    pattern: &str,
    path: Option<&str>,
    context_lines: Option<usize>,
    file_type: Option<&str>,
) -> Result<Value, DispatchError> {
    if pattern.is_empty() {
        return Err(DispatchError::InvalidArguments {
            tool: "search_code".to_string(),
            reason: "pattern must not be empty".to_string(),
        });
    }

    let dir = ws.resolve(path.unwrap_or("."))?;
    let context = context_lines.unwrap_or(2).min(MAX_CONTEXT_LINES);

    let mut engine = Engine::Ripgrep;
    let excerpts = match run(engine, &engine.excerpt_args(pattern, context, file_type, &dir), ws.root()).await {
        Ok(result) => result,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("ripgrep not available, falling back to grep");
            engine = Engine::Grep;
            run(engine, &engine.excerpt_args(pattern, context, file_type, &dir), ws.root())
                .await
                .map_err(|e| DispatchError::Failed(format!("Search failed: {}", e)))?
        }
        Err(e) => return Err(DispatchError::Failed(format!("Search failed: {}", e))),
    }
    .map_err(|stderr| DispatchError::Failed(format!("Search failed: {}", stderr)))?;

    let counts = run(engine, &engine.count_args(pattern, file_type, &dir), ws.root())
        .await
        .ok()
        .and_then(Result::ok)
        .unwrap_or_default();

    let root_prefix = format!("{}/", ws.root().to_string_lossy());
    let all_lines: Vec<&str> = excerpts.lines().collect();
    let truncated = all_lines.len() > MAX_EXCERPT_LINES;
    let results: String = all_lines
        .iter()
        .take(MAX_EXCERPT_LINES)
        .map(|line| line.strip_prefix(root_prefix.as_str()).unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n");

    let files = parse_counts(&counts, ws);
    let total_matches: usize = files
        .iter()
        .filter_map(|f| f["matches"].as_u64())
        .sum::<u64>() as usize;

    Ok(json!({
        "success": true,
        "pattern": pattern,
        "engine": engine.program(),
        "results": results,
        "truncated": truncated,
        "files": files,
        "totalMatches": total_matches,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_finds_matches() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn alpha() {}\nfn beta() {}\n").unwrap();
        std::fs::write(dir.path().join("b.rs"), "// alpha again\n").unwrap();

        let result = search_code(&ws, "alpha", None, Some(0), None).await.unwrap();
        assert_eq!(result["success"], true);
        assert_eq!(result["totalMatches"], 2);
        assert!(result["results"].as_str().unwrap().contains("alpha"));
    }

    #[tokio::test]
    async fn test_search_no_matches_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("a.txt"), "nothing here").unwrap();

        let result = search_code(&ws, "zzz_not_present", None, None, None).await.unwrap();
        assert_eq!(result["totalMatches"], 0);
        assert_eq!(result["results"], "");
    }

    #[tokio::test]
    async fn test_empty_pattern_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        assert!(search_code(&ws, "", None, None, None).await.is_err());
    }
}
