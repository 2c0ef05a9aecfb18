//! `POST /api/chat/stream`

use axum::{
    extract::State,
    response::{sse::Event, IntoResponse},
    Json,
};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info_span, Instrument};

use super::sse::{chat_frame, into_sse, terminated};
use super::AppState;
use crate::error::{GatewayError, Result};
use crate::llm::ChatMessage;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

/// Run the orchestrator for one message and stream its events
///
/// The loop runs in its own task and feeds a bounded channel; a client
/// that goes away stops the loop at the next event instead of aborting
/// the model or tool call already in flight.
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse> {
    if request.message.trim().is_empty() {
        return Err(GatewayError::BadRequest("message is required".to_string()));
    }

    let span = info_span!(
        "chat_request",
        history = request.history.len(),
        otel.name = "chat_request"
    );
    let events = state.orchestrator.run(request.message, request.history);
    let (tx, rx) = mpsc::channel(100);

    tokio::spawn(
        async move {
            futures_util::pin_mut!(events);
            while let Some(event) = events.next().await {
                if tx.send(event).await.is_err() {
                    debug!("Chat client disconnected, stopping loop");
                    break;
                }
            }
        }
        .instrument(span),
    );

    let frames = terminated(ReceiverStream::new(rx)).map(|event| -> Event { chat_frame(&event) });
    Ok(into_sse(frames))
}
