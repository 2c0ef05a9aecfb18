//! Direct shell execution: buffered and streamed
//!
//! The streaming variant owns the child's process group for as long as the
//! response body lives; dropping the body (client disconnect) kills the
//! whole tree.

use std::process::ExitStatus;

use async_stream::stream;
use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing::{info, warn};

use super::sse::{error_frame, frame, into_sse};
use super::AppState;
use crate::error::{GatewayError, Result};
use crate::metrics::SANDBOX_EXECUTIONS;
use crate::tools::shell::{
    kill_group, run_shell, spawn_in_group, ProcessGroupGuard, ShellOutput, SHELL_TIMEOUT,
};

#[derive(Debug, Deserialize)]
pub struct ExecRequest {
    pub command: String,
    #[serde(default)]
    pub cwd: Option<String>,
}

fn outcome(output: &ShellOutput) -> &'static str {
    if output.timed_out {
        "timeout"
    } else if output.success {
        "success"
    } else {
        "failure"
    }
}

fn resolve_cwd(state: &AppState, request: &ExecRequest) -> Result<std::path::PathBuf> {
    if request.command.trim().is_empty() {
        return Err(GatewayError::BadRequest("command is required".to_string()));
    }
    Ok(state
        .workspace
        .resolve(request.cwd.as_deref().unwrap_or("."))?)
}

/// `POST /api/sandbox/exec`
pub async fn exec(
    State(state): State<AppState>,
    Json(request): Json<ExecRequest>,
) -> Result<Json<ShellOutput>> {
    let dir = resolve_cwd(&state, &request)?;
    info!(command = %request.command, cwd = %dir.display(), "Sandbox exec");

    let output = match run_shell(&request.command, &dir, SHELL_TIMEOUT).await {
        Ok(output) => output,
        Err(e) => {
            SANDBOX_EXECUTIONS.with_label_values(&["buffered", "error"]).inc();
            return Err(GatewayError::Io(e));
        }
    };
    SANDBOX_EXECUTIONS
        .with_label_values(&["buffered", outcome(&output)])
        .inc();
    Ok(Json(output))
}

/// Next line with its terminator stripped, decoded lossily
///
/// Invalid UTF-8 becomes U+FFFD instead of ending the stream.
async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Option<String> {
    let mut buf = Vec::new();
    match reader.read_until(b'\n', &mut buf).await {
        Ok(0) | Err(_) => None,
        Ok(_) => {
            if buf.last() == Some(&b'\n') {
                buf.pop();
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
            }
            Some(String::from_utf8_lossy(&buf).into_owned())
        }
    }
}

enum Next {
    Stdout(Option<String>),
    Stderr(Option<String>),
    TimedOut,
}

/// `POST /api/sandbox/exec/stream`
///
/// Frames: `stdout{data}` / `stderr{data}` per line, then `exit{code,success}`,
/// or `error{message}` on spawn failure or timeout.
pub async fn exec_stream(
    State(state): State<AppState>,
    Json(request): Json<ExecRequest>,
) -> Result<impl IntoResponse> {
    let dir = resolve_cwd(&state, &request)?;
    let command = request.command;
    info!(command = %command, cwd = %dir.display(), "Sandbox stream");

    let frames = stream! {
        let mut child = match spawn_in_group(&command, &dir) {
            Ok(child) => child,
            Err(e) => {
                SANDBOX_EXECUTIONS.with_label_values(&["stream", "error"]).inc();
                yield error_frame(format!("Failed to spawn command: {}", e));
                return;
            }
        };
        let pid = child.id().unwrap_or(0);
        let mut group = ProcessGroupGuard::new(pid);

        let mut stdout = child.stdout.take().map(BufReader::new);
        let mut stderr = child.stderr.take().map(BufReader::new);
        let deadline = Instant::now() + SHELL_TIMEOUT;
        let mut timed_out = false;

        while stdout.is_some() || stderr.is_some() {
            let next = tokio::select! {
                line = async { read_line(stdout.as_mut()?).await }, if stdout.is_some() => Next::Stdout(line),
                line = async { read_line(stderr.as_mut()?).await }, if stderr.is_some() => Next::Stderr(line),
                _ = tokio::time::sleep_until(deadline) => Next::TimedOut,
            };
            match next {
                Next::Stdout(Some(line)) => yield frame("stdout", &json!({ "data": format!("{}\n", line) })),
                Next::Stdout(None) => stdout = None,
                Next::Stderr(Some(line)) => yield frame("stderr", &json!({ "data": format!("{}\n", line) })),
                Next::Stderr(None) => stderr = None,
                Next::TimedOut => {
                    timed_out = true;
                    break;
                }
            }
        }

        let status: Option<ExitStatus> = if timed_out {
            None
        } else {
            match tokio::time::timeout_at(deadline, child.wait()).await {
                Ok(Ok(status)) => Some(status),
                Ok(Err(e)) => {
                    SANDBOX_EXECUTIONS.with_label_values(&["stream", "error"]).inc();
                    yield error_frame(format!("Failed to wait for command: {}", e));
                    return;
                }
                Err(_) => None,
            }
        };

        match status {
            Some(status) => {
                group.disarm();
                let success = status.success();
                SANDBOX_EXECUTIONS
                    .with_label_values(&["stream", if success { "success" } else { "failure" }])
                    .inc();
                yield frame("exit", &json!({ "code": status.code(), "success": success }));
            }
            None => {
                warn!(command = %command, timeout_secs = SHELL_TIMEOUT.as_secs(), "Streamed command timed out");
                kill_group(pid);
                group.disarm();
                let _ = child.wait().await;
                SANDBOX_EXECUTIONS.with_label_values(&["stream", "timeout"]).inc();
                yield error_frame(format!("Command timed out after {}s", SHELL_TIMEOUT.as_secs()));
            }
        }
    };

    Ok(into_sse(frames))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_line_keeps_going_past_invalid_utf8() {
        let mut reader = BufReader::new(&b"before\n\xffbad\r\nafter"[..]);
        assert_eq!(read_line(&mut reader).await.as_deref(), Some("before"));
        assert_eq!(read_line(&mut reader).await.as_deref(), Some("\u{FFFD}bad"));
        assert_eq!(read_line(&mut reader).await.as_deref(), Some("after"));
        assert_eq!(read_line(&mut reader).await, None);
    }
}
