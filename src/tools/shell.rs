//! Shell command execution
//!
//! Commands run under `sh -c` in their own process group so a timeout or a
//! dropped client can take down the whole tree, not just the shell.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Wall-clock limit for buffered commands
pub const SHELL_TIMEOUT: Duration = Duration::from_secs(60);
/// Per-stream cap on captured output, in characters
pub const MAX_OUTPUT_CHARS: usize = 10_000;

#[derive(Debug, Clone, Serialize)]
pub struct ShellOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub timed_out: bool,
    pub duration_ms: u64,
}

/// Keep the first `max` characters, marking the cut
pub fn truncate_chars(text: &str, max: usize) -> (String, bool) {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => (
            format!("{}\n... [truncated]", &text[..byte_idx]),
            true,
        ),
        None => (text.to_string(), false),
    }
}

fn group_command(command: &str, cwd: &Path) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .process_group(0);
    cmd
}

/// Spawn a command in a fresh process group with piped stdout/stderr
pub fn spawn_in_group(command: &str, cwd: &Path) -> std::io::Result<Child> {
    group_command(command, cwd).spawn()
}

/// SIGKILL an entire process group; the group id is the leader's pid
pub fn kill_group(pid: u32) {
    if pid == 0 {
        return;
    }
    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        // ESRCH just means everything already exited
        if e != nix::errno::Errno::ESRCH {
            warn!(pid, error = %e, "Failed to kill process group");
        }
    }
}

/// Kills the process group on drop unless disarmed
pub struct ProcessGroupGuard {
    pid: u32,
    armed: bool,
}

impl ProcessGroupGuard {
    pub fn new(pid: u32) -> Self {
        Self { pid, armed: true }
    }

    /// The child exited on its own; nothing to clean up
    pub fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if self.armed {
            debug!(pid = self.pid, "Killing orphaned process group");
            kill_group(self.pid);
        }
    }
}

/// Run a command to completion (or timeout), capturing truncated output
pub async fn run_shell(command: &str, cwd: &Path, timeout: Duration) -> std::io::Result<ShellOutput> {
    let start = Instant::now();
    let mut child = spawn_in_group(command, cwd)?;
    let pid = child.id().unwrap_or(0);

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(reader) = stdout.as_mut() {
            reader.read_to_end(&mut buf).await?;
        }
        Ok::<Vec<u8>, std::io::Error>(buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(reader) = stderr.as_mut() {
            reader.read_to_end(&mut buf).await?;
        }
        Ok::<Vec<u8>, std::io::Error>(buf)
    });

    let status = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => Some(status?),
        Err(_) => {
            warn!(command, timeout_secs = timeout.as_secs(), "Command timed out");
            kill_group(pid);
            let _ = child.wait().await;
            None
        }
    };

    let stdout = match stdout_task.await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).to_string(),
        _ => String::new(),
    };
    let mut stderr = match stderr_task.await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).to_string(),
        _ => String::new(),
    };

    let timed_out = status.is_none();
    if timed_out {
        if !stderr.is_empty() {
            stderr.push('\n');
        }
        stderr.push_str(&format!("Command timed out after {}s", timeout.as_secs()));
    }

    let (stdout, _) = truncate_chars(&stdout, MAX_OUTPUT_CHARS);
    let (stderr, _) = truncate_chars(&stderr, MAX_OUTPUT_CHARS);
    let code = status.and_then(|s| s.code());

    Ok(ShellOutput {
        success: code == Some(0),
        stdout,
        stderr,
        code,
        timed_out,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        let (short, cut) = truncate_chars("hello", 10);
        assert_eq!(short, "hello");
        assert!(!cut);

        let (long, cut) = truncate_chars(&"é".repeat(20), 5);
        assert!(cut);
        assert!(long.starts_with("ééééé\n"));
    }

    #[tokio::test]
    async fn test_run_shell_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_shell("echo hi; echo oops >&2; exit 3", dir.path(), SHELL_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "hi");
        assert_eq!(out.stderr.trim(), "oops");
        assert_eq!(out.code, Some(3));
        assert!(!out.success);
    }

    #[tokio::test]
    async fn test_run_shell_truncates_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_shell("head -c 20000 /dev/zero | tr '\\0' 'a'", dir.path(), SHELL_TIMEOUT)
            .await
            .unwrap();
        assert!(out.success);
        assert!(out.stdout.ends_with("[truncated]"));
        assert!(out.stdout.chars().count() < 10_100);
    }

    #[tokio::test]
    async fn test_run_shell_timeout_kills_group() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_shell("sleep 30 & sleep 30", dir.path(), Duration::from_millis(300))
            .await
            .unwrap();
        assert!(out.timed_out);
        assert!(out.code.is_none());
        assert!(out.stderr.contains("timed out"));
    }
}
