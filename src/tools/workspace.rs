//! Workspace root and path containment

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::error::DispatchError;

/// Directory every tool path is resolved against
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create the workspace, making the directory if needed
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a caller-supplied path inside the workspace
    ///
    /// Relative paths join onto the root, absolute paths are taken as-is, and
    /// `.`/`..` are folded lexically. The deepest existing ancestor is then
    /// canonicalized so symlinks are followed before the containment check.
    /// Anything that lands outside the root is rejected.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf, DispatchError> {
        let trimmed = requested.trim();
        let candidate = if trimmed.is_empty() || trimmed == "." {
            self.root.clone()
        } else {
            let p = Path::new(trimmed);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                self.root.join(p)
            }
        };

        let outside = || DispatchError::OutsideWorkspace(requested.to_string());
        let resolved = resolve_links(&normalize(&candidate)).ok_or_else(outside)?;
        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            Err(outside())
        }
    }

    /// Path relative to the root, for display
    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|_| path.to_string_lossy().to_string())
    }
}

/// Canonicalize the deepest existing ancestor and re-append the missing tail
///
/// Returns `None` for a dangling symlink, whose target cannot be checked.
fn resolve_links(path: &Path) -> Option<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut missing: Vec<OsString> = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(mut resolved) => {
                for part in missing.iter().rev() {
                    resolved.push(part);
                }
                return Some(resolved);
            }
            Err(_) if existing.symlink_metadata().is_ok() => return None,
            Err(_) => {
                missing.push(existing.file_name()?.to_os_string());
                existing.pop();
            }
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_root() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        assert_eq!(ws.resolve("").unwrap(), ws.root());
        assert_eq!(ws.resolve(".").unwrap(), ws.root());
        assert_eq!(ws.resolve("src/main.rs").unwrap(), ws.root().join("src/main.rs"));
        assert_eq!(ws.resolve("a/../b.txt").unwrap(), ws.root().join("b.txt"));
    }

    #[test]
    fn test_rejects_escape() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        assert!(matches!(
            ws.resolve("../../etc/passwd"),
            Err(DispatchError::OutsideWorkspace(_))
        ));
        assert!(ws.resolve("/etc/passwd").is_err());
    }

    #[test]
    fn test_absolute_inside_root_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        let inside = ws.root().join("notes.md");
        assert_eq!(ws.resolve(inside.to_str().unwrap()).unwrap(), inside);
        assert_eq!(ws.relative(&inside), "notes.md");
    }

    #[cfg(unix)]
    #[test]
    fn test_rejects_symlink_out_of_root() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "TOPSECRET").unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        std::os::unix::fs::symlink(outside.path(), ws.root().join("link")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("missing"),
            ws.root().join("dangling"),
        )
        .unwrap();

        assert!(matches!(
            ws.resolve("link/secret.txt"),
            Err(DispatchError::OutsideWorkspace(_))
        ));
        assert!(ws.resolve("link/new/file.txt").is_err());
        assert!(ws.resolve("dangling").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_inside_root_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path()).unwrap();
        std::fs::create_dir(ws.root().join("real")).unwrap();
        std::os::unix::fs::symlink(ws.root().join("real"), ws.root().join("alias")).unwrap();
        assert_eq!(
            ws.resolve("alias/new.txt").unwrap(),
            ws.root().join("real/new.txt")
        );
    }
}
