//! Git clone and repository analysis

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::info;
use walkdir::WalkDir;

use super::workspace::Workspace;
use crate::error::DispatchError;

const CLONE_TIMEOUT: Duration = Duration::from_secs(300);
const TREE_DEPTH: usize = 3;
const TREE_MAX_ENTRIES: usize = 200;
const TOP_EXTENSIONS: usize = 15;

/// Files whose presence says something about the project's stack
const MANIFESTS: &[&str] = &[
    "package.json",
    "Cargo.toml",
    "pyproject.toml",
    "requirements.txt",
    "setup.py",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "Gemfile",
    "composer.json",
    "Makefile",
    "CMakeLists.txt",
    "Dockerfile",
    "docker-compose.yml",
    "README.md",
];

const SKIP_DIRS: &[&str] = &[".git", "node_modules", "target", "dist", "build", "__pycache__", ".venv"];

lazy_static! {
    static ref SHORTHAND: Regex =
        Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$").expect("shorthand pattern is valid");
}

/// `owner/repo` becomes a GitHub URL; anything else is used verbatim
pub fn normalize_repo_ref(repo: &str) -> String {
    let repo = repo.trim();
    if SHORTHAND.is_match(repo) && !repo.contains("://") {
        let repo = repo.trim_end_matches(".git");
        format!("https://github.com/{}.git", repo)
    } else {
        repo.to_string()
    }
}

/// Directory name git would pick for a URL
pub fn default_directory(url: &str) -> String {
    let last = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or("repo");
    let name = last.trim_end_matches(".git");
    if name.is_empty() {
        "repo".to_string()
    } else {
        name.to_string()
    }
}

/// Run git and return trimmed stdout, or "" on any failure
async fn git_output(args: &[&str], cwd: &Path) -> String {
    match Command::new("git").args(args).current_dir(cwd).output().await {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).trim().to_string(),
        _ => String::new(),
    }
}

fn is_skipped(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|n| SKIP_DIRS.contains(&n))
            .unwrap_or(false)
}

fn count_files(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .count()
}

pub async fn git_clone(
    ws: &Workspace,
    repo: &str,
    directory: Option<&str>,
    branch: Option<&str>,
) -> Result<Value, DispatchError> {
    let url = normalize_repo_ref(repo);
    let dir_name = directory
        .map(str::to_string)
        .unwrap_or_else(|| default_directory(&url));
    let target = ws.resolve(&dir_name)?;

    if target.exists() {
        return Err(DispatchError::Failed(format!(
            "Directory '{}' already exists in workspace. Use a different directory name or remove it first.",
            dir_name
        )));
    }

    let mut cmd = Command::new("git");
    cmd.arg("clone").arg("--depth").arg("1");
    if let Some(branch) = branch {
        cmd.arg("--branch").arg(branch);
    }
    cmd.arg(&url).arg(&target).current_dir(ws.root()).kill_on_drop(true);

    info!(url = %url, target = %dir_name, "Cloning repository");
    let output = tokio::time::timeout(CLONE_TIMEOUT, cmd.output())
        .await
        .map_err(|_| DispatchError::Failed(format!("git clone timed out after {}s", CLONE_TIMEOUT.as_secs())))?
        .map_err(|e| DispatchError::Failed(format!("Failed to run git: {}", e)))?;

    if !output.status.success() {
        return Err(DispatchError::Failed(format!(
            "git clone failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let count_target = target.clone();
    let file_count = tokio::task::spawn_blocking(move || count_files(&count_target))
        .await
        .unwrap_or(0);
    let last_commit = git_output(&["log", "-1", "--pretty=format:%h %s (%an, %ar)"], &target).await;

    Ok(json!({
        "success": true,
        "url": url,
        "directory": dir_name,
        "path": ws.relative(&target),
        "fileCount": file_count,
        "lastCommit": last_commit,
    }))
}

struct RepoScan {
    tree: Vec<String>,
    tree_truncated: bool,
    extensions: Vec<(String, usize)>,
    manifests: Vec<String>,
    total_files: usize,
}

fn scan_repo(root: &Path) -> RepoScan {
    let mut tree = Vec::new();
    let mut tree_truncated = false;
    let mut extensions: HashMap<String, usize> = HashMap::new();
    let mut total_files = 0;

    for entry in WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .filter_map(Result::ok)
    {
        let is_dir = entry.file_type().is_dir();
        if !is_dir {
            total_files += 1;
            let ext = entry
                .path()
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_else(|| "(none)".to_string());
            *extensions.entry(ext).or_default() += 1;
        }

        if entry.depth() <= TREE_DEPTH {
            if tree.len() < TREE_MAX_ENTRIES {
                let indent = "  ".repeat(entry.depth() - 1);
                let suffix = if is_dir { "/" } else { "" };
                tree.push(format!("{}{}{}", indent, entry.file_name().to_string_lossy(), suffix));
            } else {
                tree_truncated = true;
            }
        }
    }

    let mut extensions: Vec<(String, usize)> = extensions.into_iter().collect();
    extensions.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    extensions.truncate(TOP_EXTENSIONS);

    let manifests = MANIFESTS
        .iter()
        .filter(|m| root.join(m).exists())
        .map(|m| m.to_string())
        .collect();

    RepoScan {
        tree,
        tree_truncated,
        extensions,
        manifests,
        total_files,
    }
}

pub async fn analyze_repo(ws: &Workspace, path: Option<&str>) -> Result<Value, DispatchError> {
    let requested = path.unwrap_or(".");
    let root = ws.resolve(requested)?;
    if !root.is_dir() {
        return Err(DispatchError::Failed(format!(
            "'{}' is not a directory in the workspace",
            requested
        )));
    }

    let scan_root = root.clone();
    let scan = tokio::task::spawn_blocking(move || scan_repo(&scan_root))
        .await
        .map_err(|e| DispatchError::Failed(e.to_string()))?;

    let remote = git_output(&["remote", "get-url", "origin"], &root).await;
    let recent_commits = git_output(&["log", "-5", "--oneline"], &root).await;

    let extensions: Vec<Value> = scan
        .extensions
        .iter()
        .map(|(ext, count)| json!({"extension": ext, "count": count}))
        .collect();

    Ok(json!({
        "success": true,
        "path": requested,
        "totalFiles": scan.total_files,
        "tree": scan.tree.join("\n"),
        "treeTruncated": scan.tree_truncated,
        "extensions": extensions,
        "manifests": scan.manifests,
        "gitRemote": remote,
        "recentCommits": recent_commits,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_repo_ref() {
        assert_eq!(normalize_repo_ref("rust-lang/cargo"), "https://github.com/rust-lang/cargo.git");
        assert_eq!(
            normalize_repo_ref("https://gitlab.com/a/b.git"),
            "https://gitlab.com/a/b.git"
        );
        assert_eq!(normalize_repo_ref("git@github.com:a/b.git"), "git@github.com:a/b.git");
    }

    #[test]
    fn test_default_directory() {
        assert_eq!(default_directory("https://github.com/rust-lang/cargo.git"), "cargo");
        assert_eq!(default_directory("git@github.com:a/b.git"), "b");
        assert_eq!(default_directory("https://example.com/x/y/"), "y");
    }

    #[tokio::test]
    async fn test_clone_refuses_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        std::fs::create_dir(dir.path().join("cargo")).unwrap();
        std::fs::write(dir.path().join("cargo/keep.txt"), "mine").unwrap();

        let err = git_clone(&ws, "rust-lang/cargo", None, None).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Directory 'cargo' already exists in workspace. Use a different directory name or remove it first."
        );
        assert_eq!(std::fs::read_to_string(dir.path().join("cargo/keep.txt")).unwrap(), "mine");
    }

    #[tokio::test]
    async fn test_analyze_plain_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "").unwrap();

        let report = analyze_repo(&ws, None).await.unwrap();
        assert_eq!(report["totalFiles"], 3);
        assert_eq!(report["manifests"][0], "Cargo.toml");
        assert_eq!(report["extensions"][0]["extension"], "rs");
        assert_eq!(report["extensions"][0]["count"], 2);
        // Not a git checkout: best-effort fields are empty
        assert_eq!(report["gitRemote"], "");
        assert!(report["tree"].as_str().unwrap().contains("src/"));
    }
}
