//! Terminal client for the chat stream.
//!
//! Posts one message to `/api/chat/stream` and prints each event as it
//! arrives.
//!
//! ```bash
//! chat_client "List the files in the workspace" [http://localhost:3000]
//! ```

use std::env;

use futures_util::StreamExt;
use serde_json::json;

use spawngate::agent::ChatEvent;

/// Pull complete `data:` payloads out of the buffer, leaving any partial frame
fn drain_frames(buffer: &mut String) -> Vec<String> {
    let mut payloads = Vec::new();
    while let Some(end) = buffer.find("\n\n") {
        let frame: String = buffer.drain(..end + 2).collect();
        let data: Vec<&str> = frame
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|d| d.strip_prefix(' ').unwrap_or(d))
            .collect();
        if !data.is_empty() {
            payloads.push(data.join("\n"));
        }
    }
    payloads
}

fn print_event(event: &ChatEvent) {
    match event {
        ChatEvent::Thinking { iteration } => println!("[CLIENT] thinking (iteration {})", iteration),
        ChatEvent::ToolStart { tool, args } => println!("[CLIENT] → {} {}", tool, args),
        ChatEvent::ToolResult { tool, result } => {
            let ok = result.get("success").and_then(|s| s.as_bool()).unwrap_or(false);
            println!("[CLIENT] ← {} ({})", tool, if ok { "ok" } else { "failed" });
        }
        ChatEvent::Artifact { artifact } => println!(
            "[CLIENT] artifact {} \"{}\"",
            artifact["id"].as_str().unwrap_or("?"),
            artifact["title"].as_str().unwrap_or("")
        ),
        ChatEvent::Response { content } => println!("\n{}\n", content),
        ChatEvent::Done { iterations, max_reached } => {
            if max_reached.unwrap_or(false) {
                println!("[CLIENT] stopped at iteration ceiling ({})", iterations);
            } else {
                println!("[CLIENT] done after {} iteration(s)", iterations);
            }
        }
        ChatEvent::Error { message } => eprintln!("[CLIENT] error: {}", message),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let message = env::args()
        .nth(1)
        .unwrap_or_else(|| "What is in the workspace?".to_string());
    let base = env::args()
        .nth(2)
        .unwrap_or_else(|| "http://localhost:3000".to_string());

    println!("[CLIENT] Sending message to {}...", base);
    let response = reqwest::Client::new()
        .post(format!("{}/api/chat/stream", base.trim_end_matches('/')))
        .json(&json!({ "message": message }))
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("gateway returned {}: {}", status, body).into());
    }

    let mut body = response.bytes_stream();
    let mut buffer = String::new();
    while let Some(chunk) = body.next().await {
        buffer.push_str(&String::from_utf8_lossy(&chunk?));
        for payload in drain_frames(&mut buffer) {
            match serde_json::from_str::<ChatEvent>(&payload) {
                Ok(event) => {
                    print_event(&event);
                    if event.is_terminal() {
                        return Ok(());
                    }
                }
                Err(e) => eprintln!("[CLIENT] unparseable frame ({}): {}", e, payload),
            }
        }
    }

    Ok(())
}
