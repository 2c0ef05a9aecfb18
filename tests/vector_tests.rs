//! Integration tests for the vector store and the knowledge tools
//!
//! A keyword embedder stands in for the real providers so similarities are
//! exact and predictable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;

use spawngate::artifact::ArtifactRegistry;
use spawngate::config::ServiceEndpoints;
use spawngate::llm::{Embedder, EmbeddingBatch, EmbeddingError};
use spawngate::tools::{CollaboratorClient, ToolDispatcher, ToolExecutor, Workspace};
use spawngate::vector::{NewDocument, SearchOptions, StoreError, VectorStore};

/// One dimension per keyword
#[derive(Default)]
struct KeywordEmbedder {
    calls: AtomicUsize,
}

const KEYWORDS: [&str; 3] = ["rust", "python", "cooking"];

fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    KEYWORDS
        .iter()
        .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
        .collect()
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<EmbeddingBatch, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(EmbeddingBatch {
            vectors: inputs.iter().map(|t| keyword_vector(t)).collect(),
            model: "keywords".to_string(),
            dimension: KEYWORDS.len(),
        })
    }
}

fn memory_store() -> (VectorStore, Arc<KeywordEmbedder>) {
    let embedder = Arc::new(KeywordEmbedder::default());
    let store = VectorStore::open_in_memory(embedder.clone()).unwrap();
    (store, embedder)
}

fn options(threshold: f32) -> SearchOptions {
    SearchOptions {
        threshold,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_store_then_search_round_trip() {
    let (store, _) = memory_store();
    let rust = store
        .store("Rust ownership rules", json!({"source": "book"}), None)
        .await
        .unwrap();
    store.store("Python decorators", json!({}), None).await.unwrap();
    store.store("Cooking pasta", json!({}), Some("kitchen")).await.unwrap();

    let hits = store.search("rust", options(0.5)).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, rust);
    assert_eq!(hits[0].collection, "default");
    assert_eq!(hits[0].metadata["source"], "book");
    assert!((hits[0].similarity - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_empty_store_returns_nothing() {
    let (store, _) = memory_store();
    let hits = store.search("rust", options(0.0)).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_results_sorted_and_limited() {
    let (store, _) = memory_store();
    store.store("rust", json!({}), None).await.unwrap();
    store.store("rust and python", json!({}), None).await.unwrap();
    store.store("rust, python and cooking", json!({}), None).await.unwrap();
    store.store("cooking", json!({}), None).await.unwrap();

    // Threshold <= 0 disables filtering
    let hits = store
        .search(
            "rust",
            SearchOptions {
                limit: 3,
                threshold: 0.0,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    assert_eq!(hits[0].content, "rust");

    // 1/sqrt(2) ≈ 0.707 passes 0.7, 1/sqrt(3) ≈ 0.577 does not
    let filtered = store.search("rust", SearchOptions::default()).await.unwrap();
    assert_eq!(filtered.len(), 2);
}

#[tokio::test]
async fn test_collection_scoped_search_and_listing() {
    let (store, _) = memory_store();
    store.store("rust notes", json!({}), Some("notes")).await.unwrap();
    store.store("rust docs", json!({}), Some("docs")).await.unwrap();
    store.store("more rust docs", json!({}), Some("docs")).await.unwrap();

    let hits = store
        .search(
            "rust",
            SearchOptions {
                collection: Some("notes".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].content, "rust notes");

    let collections = store.list_collections().await.unwrap();
    let counts: Vec<(String, i64)> = collections.into_iter().map(|c| (c.name, c.count)).collect();
    assert_eq!(counts, vec![("docs".to_string(), 2), ("notes".to_string(), 1)]);

    assert_eq!(store.clear_collection("docs").await.unwrap(), 2);
    assert_eq!(store.clear_collection("docs").await.unwrap(), 0);
    assert_eq!(store.list_collections().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_document() {
    let (store, _) = memory_store();
    let id = store.store("rust", json!({}), None).await.unwrap();

    store.delete_document(id).await.unwrap();
    assert!(matches!(store.get(id).await, Err(StoreError::NotFound(_))));
    assert!(matches!(
        store.delete_document(id).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_batch_store_embeds_once() {
    let (store, embedder) = memory_store();
    let ids = store
        .store_batch(vec![
            NewDocument {
                content: "rust".into(),
                ..Default::default()
            },
            NewDocument {
                content: "python".into(),
                collection: Some("langs".into()),
                ..Default::default()
            },
            NewDocument {
                content: "cooking".into(),
                metadata: Some(json!({"tag": "food"})),
                ..Default::default()
            },
        ])
        .await
        .unwrap();

    assert_eq!(ids.len(), 3);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);

    let doc = store.get(ids[2]).await.unwrap();
    assert_eq!(doc.metadata["tag"], "food");
    assert_eq!(doc.embedding, vec![0.0, 0.0, 1.0]);
    assert_eq!(store.get(ids[1]).await.unwrap().collection, "langs");
}

#[tokio::test]
async fn test_file_backed_store_persists() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("vectors.db");

    let id = {
        let embedder = Arc::new(KeywordEmbedder::default());
        let store = VectorStore::open(&path, embedder).unwrap();
        store.store("rust persisted", json!({}), None).await.unwrap()
    };

    // Reopening runs the idempotent schema setup again
    let store = VectorStore::open(&path, Arc::new(KeywordEmbedder::default())).unwrap();
    let doc = store.get(id).await.unwrap();
    assert_eq!(doc.content, "rust persisted");
    assert_eq!(doc.embedding, vec![1.0, 0.0, 0.0]);
}

fn dispatcher(store: VectorStore, dir: &TempDir) -> ToolDispatcher {
    ToolDispatcher::new(
        Workspace::new(dir.path()).unwrap(),
        Arc::new(ArtifactRegistry::new()),
        store,
        CollaboratorClient::new(ServiceEndpoints::default()),
    )
}

#[tokio::test]
async fn test_semantic_search_high_threshold_is_empty() {
    let dir = TempDir::new().unwrap();
    let (store, _) = memory_store();
    store.store("rust and python", json!({}), None).await.unwrap();
    let tools = dispatcher(store, &dir);

    let result = tools
        .execute("semantic_search", json!({"query": "rust", "threshold": 0.99}))
        .await;
    assert_eq!(result["success"], true);
    assert_eq!(result["count"], 0);
    assert_eq!(result["results"], json!([]));
}

#[tokio::test]
async fn test_knowledge_tools() {
    let dir = TempDir::new().unwrap();
    let (store, _) = memory_store();
    let tools = dispatcher(store, &dir);

    let long = format!("rust {}", "x".repeat(200));
    let stored = tools
        .execute(
            "store_knowledge",
            json!({"content": long, "collection": "notes", "metadata": {"k": 1}}),
        )
        .await;
    assert_eq!(stored["success"], true);
    assert_eq!(stored["collection"], "notes");
    let preview = stored["preview"].as_str().unwrap();
    assert_eq!(preview.chars().count(), 103);
    assert!(preview.ends_with("..."));

    let found = tools
        .execute("semantic_search", json!({"query": "rust"}))
        .await;
    assert_eq!(found["count"], 1);
    assert_eq!(found["results"][0]["id"], stored["id"]);

    let listed = tools.execute("list_knowledge_collections", json!({})).await;
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["collections"][0]["name"], "notes");
}
