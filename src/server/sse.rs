//! Server-sent event framing
//!
//! Every stream is wrapped so the in-flight gauge tracks it, and chat
//! streams are forced to end with exactly one `done` or `error` frame.

use std::convert::Infallible;

use async_stream::stream;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use serde_json::json;

use crate::agent::ChatEvent;
use crate::metrics::StreamGuard;

/// Named frame with a JSON payload
pub fn frame<T: Serialize>(name: &str, data: &T) -> Event {
    let payload = serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(name).data(payload)
}

pub fn error_frame(message: impl std::fmt::Display) -> Event {
    frame("error", &json!({ "message": message.to_string() }))
}

/// Chat events are framed under their own `type` name
pub fn chat_frame(event: &ChatEvent) -> Event {
    frame(event.name(), event)
}

/// Stop after the first terminal event; synthesize an `error` if none arrives
pub fn terminated<S>(events: S) -> impl Stream<Item = ChatEvent> + Send + 'static
where
    S: Stream<Item = ChatEvent> + Send + 'static,
{
    stream! {
        futures_util::pin_mut!(events);
        let mut finished = false;
        while let Some(event) = events.next().await {
            let terminal = event.is_terminal();
            yield event;
            if terminal {
                finished = true;
                break;
            }
        }
        if !finished {
            yield ChatEvent::Error { message: "Stream ended unexpectedly".to_string() };
        }
    }
}

/// Turn a frame stream into an SSE response body
pub fn into_sse<S>(frames: S) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static>
where
    S: Stream<Item = Event> + Send + 'static,
{
    let body = stream! {
        let _guard = StreamGuard::open();
        futures_util::pin_mut!(frames);
        while let Some(event) = frames.next().await {
            yield Ok::<Event, Infallible>(event);
        }
    };
    Sse::new(body).keep_alive(KeepAlive::default())
}
