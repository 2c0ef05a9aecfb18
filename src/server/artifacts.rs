//! Artifact endpoints

use async_stream::stream;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use super::sse::{frame, into_sse};
use super::AppState;
use crate::artifact::{build_artifact, schema, validate, Artifact};
use crate::error::{GatewayError, Result};

/// Characters per `file_chunk` frame
pub const STREAM_CHUNK_CHARS: usize = 512;

fn not_found(id: &str) -> GatewayError {
    GatewayError::NotFound(format!("artifact {}", id))
}

fn build_and_register(state: &AppState, input: Value) -> Result<Artifact> {
    if !input.is_object() {
        return Err(GatewayError::BadRequest(
            "Artifact must be an object".to_string(),
        ));
    }
    let artifact = build_artifact(input);
    info!(
        id = %artifact.id,
        status = artifact.status.as_str(),
        score = artifact.validation.score,
        "Artifact created"
    );
    state.artifacts.insert(artifact.clone());
    Ok(artifact)
}

/// `POST /api/artifacts`
///
/// Invalid artifacts are registered too, with `status: "invalid"`.
pub async fn create_artifact(
    State(state): State<AppState>,
    Json(input): Json<Value>,
) -> Result<impl IntoResponse> {
    let artifact = build_and_register(&state, input)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "artifact": artifact })),
    ))
}

pub async fn list_artifacts(State(state): State<AppState>) -> Json<Value> {
    let artifacts = state.artifacts.list();
    Json(json!({
        "success": true,
        "count": artifacts.len(),
        "artifacts": artifacts,
    }))
}

pub async fn get_artifact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let artifact = state.artifacts.get(&id).ok_or_else(|| not_found(&id))?;
    Ok(Json(json!({ "success": true, "artifact": artifact })))
}

/// Shallow merge, then full rebuild and re-validation
pub async fn patch_artifact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>> {
    if !patch.is_object() {
        return Err(GatewayError::BadRequest("Patch must be an object".to_string()));
    }
    let artifact = state
        .artifacts
        .patch(&id, &patch)
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(json!({ "success": true, "artifact": artifact })))
}

pub async fn delete_artifact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    state.artifacts.remove(&id).ok_or_else(|| not_found(&id))?;
    Ok(Json(json!({ "success": true, "id": id })))
}

/// Validate without building or storing
pub async fn validate_artifact(Json(input): Json<Value>) -> Json<Value> {
    let validation = validate(&input);
    Json(json!({ "success": true, "validation": validation }))
}

pub async fn schema_types() -> Json<Value> {
    let mut body = schema::schema_types();
    if let Some(map) = body.as_object_mut() {
        map.insert("success".to_string(), Value::Bool(true));
    }
    Json(body)
}

/// Split on char boundaries into pieces of at most `size` characters
///
/// Returns `(char_offset, chunk)` pairs.
pub fn chunk_chars(content: &str, size: usize) -> Vec<(usize, &str)> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut start_byte = 0;
    let mut start_char = 0;
    for (count, (byte_idx, _)) in content.char_indices().enumerate() {
        if count > start_char && count - start_char == size {
            chunks.push((start_char, &content[start_byte..byte_idx]));
            start_byte = byte_idx;
            start_char = count;
        }
    }
    if start_byte < content.len() {
        chunks.push((start_char, &content[start_byte..]));
    }
    chunks
}

/// `POST /api/artifacts/stream`
///
/// Builds and registers the artifact, then replays it as
/// `start`, per-file `file_start`/`file_chunk`/`file_end`, `complete`, `done`.
pub async fn stream_artifact(
    State(state): State<AppState>,
    Json(input): Json<Value>,
) -> impl IntoResponse {
    let built = build_and_register(&state, input);

    let frames = stream! {
        let artifact = match built {
            Ok(artifact) => artifact,
            Err(e) => {
                yield super::sse::error_frame(e);
                return;
            }
        };
        let files = artifact.files();

        yield frame("start", &json!({
            "id": artifact.id,
            "type": artifact.artifact_type(),
            "title": artifact.title(),
            "fileCount": files.len(),
        }));

        for (index, file) in files.iter().enumerate() {
            yield frame("file_start", &json!({
                "index": index,
                "path": file.path,
                "language": file.language,
            }));
            for (offset, chunk) in chunk_chars(&file.content, STREAM_CHUNK_CHARS) {
                yield frame("file_chunk", &json!({
                    "index": index,
                    "path": file.path,
                    "offset": offset,
                    "chunk": chunk,
                }));
            }
            yield frame("file_end", &json!({
                "index": index,
                "path": file.path,
                "size": file.content.chars().count(),
            }));
        }

        yield frame("complete", &json!({ "artifact": artifact }));
        yield frame("done", &json!({}));
    };

    into_sse(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_chars_boundaries() {
        let text = "é".repeat(5);
        let chunks = chunk_chars(&text, 2);
        assert_eq!(chunks, vec![(0, "éé"), (2, "éé"), (4, "é")]);
    }

    #[test]
    fn test_chunk_chars_exact_and_empty() {
        assert!(chunk_chars("", 512).is_empty());
        let text = "a".repeat(1024);
        let chunks = chunk_chars(&text, 512);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].0, 512);
    }
}
