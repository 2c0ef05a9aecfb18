//! Workspace file tools

use serde_json::{json, Value};
use walkdir::WalkDir;

use super::shell::truncate_chars;
use super::workspace::Workspace;
use crate::error::DispatchError;

/// Cap on characters returned by `read_file`
pub const MAX_READ_CHARS: usize = 50_000;
/// Cap on entries returned by a recursive listing
const MAX_LIST_ENTRIES: usize = 1_000;

fn io_failure(action: &str, path: &str, e: std::io::Error) -> DispatchError {
    DispatchError::Failed(format!("Failed to {} '{}': {}", action, path, e))
}

pub async fn read_file(ws: &Workspace, path: &str) -> Result<Value, DispatchError> {
    let full = ws.resolve(path)?;
    let content = tokio::fs::read_to_string(&full)
        .await
        .map_err(|e| io_failure("read", path, e))?;

    let total_chars = content.chars().count();
    let (content, truncated) = truncate_chars(&content, MAX_READ_CHARS);

    Ok(json!({
        "success": true,
        "path": ws.relative(&full),
        "content": content,
        "size": total_chars,
        "truncated": truncated,
    }))
}

pub async fn write_file(ws: &Workspace, path: &str, content: &str) -> Result<Value, DispatchError> {
    let full = ws.resolve(path)?;
    if full == ws.root() {
        return Err(DispatchError::Failed("Cannot write to the workspace root".to_string()));
    }
    if let Some(parent) = full.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| io_failure("create directories for", path, e))?;
    }
    tokio::fs::write(&full, content)
        .await
        .map_err(|e| io_failure("write", path, e))?;

    Ok(json!({
        "success": true,
        "path": ws.relative(&full),
        "bytes": content.len(),
    }))
}

pub async fn list_files(ws: &Workspace, path: Option<&str>, recursive: bool) -> Result<Value, DispatchError> {
    let requested = path.unwrap_or(".");
    let full = ws.resolve(requested)?;
    let root = ws.clone();

    let entries = tokio::task::spawn_blocking(move || -> Result<Vec<Value>, DispatchError> {
        if !full.is_dir() {
            return Err(DispatchError::Failed(format!(
                "'{}' is not a directory",
                root.relative(&full)
            )));
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut entries = Vec::new();
        for entry in WalkDir::new(&full)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git")
            .filter_map(Result::ok)
            .take(MAX_LIST_ENTRIES)
        {
            let is_dir = entry.file_type().is_dir();
            let size = if is_dir {
                0
            } else {
                entry.metadata().map(|m| m.len()).unwrap_or(0)
            };
            entries.push(json!({
                "name": entry.file_name().to_string_lossy(),
                "path": root.relative(entry.path()),
                "type": if is_dir { "directory" } else { "file" },
                "size": size,
            }));
        }
        Ok(entries)
    })
    .await
    .map_err(|e| DispatchError::Failed(e.to_string()))??;

    Ok(json!({
        "success": true,
        "path": requested,
        "count": entries.len(),
        "files": entries,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();

        let written = write_file(&ws, "nested/hello.txt", "hi there").await.unwrap();
        assert_eq!(written["path"], "nested/hello.txt");

        let read = read_file(&ws, "nested/hello.txt").await.unwrap();
        assert_eq!(read["content"], "hi there");
        assert_eq!(read["truncated"], false);
    }

    #[tokio::test]
    async fn test_read_truncates_large_file() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("big.txt"), "x".repeat(60_000)).unwrap();

        let read = read_file(&ws, "big.txt").await.unwrap();
        assert_eq!(read["truncated"], true);
        assert_eq!(read["size"], 60_000);
    }

    #[tokio::test]
    async fn test_read_outside_workspace_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        let err = read_file(&ws, "../secret").await.unwrap_err();
        assert!(matches!(err, DispatchError::OutsideWorkspace(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_dir_cannot_leak_outside_files() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "TOPSECRET").unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        std::os::unix::fs::symlink(outside.path(), ws.root().join("link")).unwrap();

        let err = read_file(&ws, "link/secret.txt").await.unwrap_err();
        assert!(matches!(err, DispatchError::OutsideWorkspace(_)));

        let err = write_file(&ws, "link/planted.txt", "x").await.unwrap_err();
        assert!(matches!(err, DispatchError::OutsideWorkspace(_)));
        assert!(!outside.path().join("planted.txt").exists());
    }

    #[tokio::test]
    async fn test_list_files_flat_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        write_file(&ws, "a.txt", "1").await.unwrap();
        write_file(&ws, "sub/b.txt", "2").await.unwrap();

        let flat = list_files(&ws, None, false).await.unwrap();
        assert_eq!(flat["count"], 2);

        let deep = list_files(&ws, None, true).await.unwrap();
        assert_eq!(deep["count"], 3);
    }
}
