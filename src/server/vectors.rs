//! Vector store endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::AppState;
use crate::error::{GatewayError, Result};
use crate::vector::{NewDocument, SearchOptions, DEFAULT_COLLECTION};

#[derive(Debug, Deserialize)]
pub struct StoreRequest {
    pub content: String,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub collection: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub documents: Vec<NewDocument>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub threshold: Option<f32>,
}

fn require_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(GatewayError::BadRequest("content is required".to_string()));
    }
    Ok(())
}

/// `POST /api/vectors/store`
pub async fn store(
    State(state): State<AppState>,
    Json(request): Json<StoreRequest>,
) -> Result<Json<Value>> {
    require_content(&request.content)?;
    let collection = request
        .collection
        .unwrap_or_else(|| DEFAULT_COLLECTION.to_string());
    let id = state
        .vectors
        .store(
            &request.content,
            request.metadata.unwrap_or_else(|| json!({})),
            Some(&collection),
        )
        .await?;
    Ok(Json(json!({ "success": true, "id": id, "collection": collection })))
}

/// `POST /api/vectors/store/batch`
pub async fn store_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<Value>> {
    for doc in &request.documents {
        require_content(&doc.content)?;
    }
    let ids = state.vectors.store_batch(request.documents).await?;
    Ok(Json(json!({ "success": true, "count": ids.len(), "ids": ids })))
}

/// `POST /api/vectors/search`
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<Value>> {
    if request.query.trim().is_empty() {
        return Err(GatewayError::BadRequest("query is required".to_string()));
    }
    let defaults = SearchOptions::default();
    let options = SearchOptions {
        limit: request.limit.unwrap_or(defaults.limit),
        collection: request.collection,
        threshold: request.threshold.unwrap_or(defaults.threshold),
    };
    let results = state.vectors.search(&request.query, options).await?;
    Ok(Json(json!({
        "success": true,
        "query": request.query,
        "count": results.len(),
        "results": results,
    })))
}

pub async fn list_collections(State(state): State<AppState>) -> Result<Json<Value>> {
    let collections = state.vectors.list_collections().await?;
    Ok(Json(json!({
        "success": true,
        "count": collections.len(),
        "collections": collections,
    })))
}

pub async fn clear_collection(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<Value>> {
    let deleted = state.vectors.clear_collection(&collection).await?;
    tracing::info!(collection = %collection, deleted, "Collection cleared");
    Ok(Json(json!({
        "success": true,
        "collection": collection,
        "deleted": deleted,
    })))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    state.vectors.delete_document(id).await?;
    Ok(Json(json!({ "success": true, "id": id })))
}
