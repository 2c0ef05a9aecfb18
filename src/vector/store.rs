//! SQLite-backed document store with exhaustive cosine search

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::similarity::{cosine_similarity, decode_embedding, encode_embedding};
use crate::llm::embeddings::{Embedder, EmbeddingError};
use crate::metrics::VECTOR_SEARCH_DURATION;

pub const DEFAULT_COLLECTION: &str = "default";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Document {0} not found")]
    NotFound(i64),

    #[error("Invalid metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store connection lock poisoned")]
    Poisoned,

    #[error("Storage task failed: {0}")]
    Task(String),
}

/// A stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDocument {
    pub id: i64,
    pub content: String,
    pub metadata: serde_json::Value,
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub collection: String,
    pub created_at: String,
}

/// Input for a single insert
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDocument {
    pub content: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub collection: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    /// Restrict to one collection; all collections when `None`
    pub collection: Option<String>,
    /// Minimum similarity; `<= 0` disables filtering
    pub threshold: f32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            collection: None,
            threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: i64,
    pub content: String,
    pub metadata: serde_json::Value,
    pub collection: String,
    pub similarity: f32,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub count: i64,
}

/// Document store over a single SQLite connection
///
/// SQLite serializes writers; the connection sits behind a mutex and every
/// query runs on the blocking pool.
#[derive(Clone)]
pub struct VectorStore {
    conn: Arc<Mutex<Connection>>,
    embedder: Arc<dyn Embedder>,
}

impl VectorStore {
    /// Open (or create) the database file and ensure the schema exists
    pub fn open(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        info!(path = %path.display(), "Opened vector store");
        Self::with_connection(conn, embedder)
    }

    /// In-memory store, used by tests
    pub fn open_in_memory(embedder: Arc<dyn Embedder>) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, embedder)
    }

    fn with_connection(conn: Connection, embedder: Arc<dyn Embedder>) -> Result<Self, StoreError> {
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            embedder,
        })
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Run a closure against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Embed and insert one document, returning its id
    pub async fn store(
        &self,
        content: &str,
        metadata: serde_json::Value,
        collection: Option<&str>,
    ) -> Result<i64, StoreError> {
        let ids = self
            .store_batch(vec![NewDocument {
                content: content.to_string(),
                metadata: Some(metadata),
                collection: collection.map(str::to_string),
            }])
            .await?;
        ids.into_iter()
            .next()
            .ok_or_else(|| StoreError::Task("insert returned no id".to_string()))
    }

    /// Embed all contents with one adapter call and insert in one transaction
    pub async fn store_batch(&self, documents: Vec<NewDocument>) -> Result<Vec<i64>, StoreError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let contents: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let batch = self.embedder.embed(&contents).await?;
        if batch.vectors.len() != documents.len() {
            return Err(EmbeddingError::Malformed(format!(
                "expected {} vectors, got {}",
                documents.len(),
                batch.vectors.len()
            ))
            .into());
        }

        let created_at = chrono::Utc::now().to_rfc3339();
        let ids = self
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                let mut ids = Vec::with_capacity(documents.len());
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO documents (content, metadata, embedding, collection, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                    )?;
                    for (doc, vector) in documents.iter().zip(batch.vectors.iter()) {
                        let metadata = doc
                            .metadata
                            .clone()
                            .filter(|m| !m.is_null())
                            .unwrap_or_else(|| serde_json::json!({}));
                        let collection = doc.collection.as_deref().unwrap_or(DEFAULT_COLLECTION);
                        stmt.execute(params![
                            doc.content,
                            serde_json::to_string(&metadata)?,
                            encode_embedding(vector),
                            collection,
                            created_at,
                        ])?;
                        ids.push(tx.last_insert_rowid());
                    }
                }
                tx.commit()?;
                Ok(ids)
            })
            .await?;

        debug!(count = ids.len(), "Stored documents");
        Ok(ids)
    }

    /// Similarity search over every stored document (optionally one collection)
    pub async fn search(&self, query: &str, options: SearchOptions) -> Result<Vec<SearchHit>, StoreError> {
        let started = Instant::now();
        let query_vector = self.embedder.embed_one(query).await?;

        let collection = options.collection.clone();
        let documents = self.with_conn(move |conn| load_documents(conn, collection.as_deref())).await?;

        let hits = rank(&query_vector, documents, &options);
        VECTOR_SEARCH_DURATION.observe(started.elapsed().as_secs_f64());
        debug!(results = hits.len(), threshold = options.threshold, "Vector search complete");
        Ok(hits)
    }

    pub async fn get(&self, id: i64) -> Result<VectorDocument, StoreError> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, content, metadata, embedding, collection, created_at
                 FROM documents WHERE id = ?1",
                params![id],
                row_to_document,
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))
        })
        .await
    }

    pub async fn list_collections(&self) -> Result<Vec<CollectionInfo>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT collection, COUNT(*) FROM documents GROUP BY collection ORDER BY collection",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(CollectionInfo {
                    name: row.get(0)?,
                    count: row.get(1)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    /// Hard-delete one document
    pub async fn delete_document(&self, id: i64) -> Result<(), StoreError> {
        let removed = self
            .with_conn(move |conn| Ok(conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?))
            .await?;
        if removed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    /// Hard-delete every document in a collection, returning how many went
    pub async fn clear_collection(&self, name: &str) -> Result<usize, StoreError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            Ok(conn.execute("DELETE FROM documents WHERE collection = ?1", params![name])?)
        })
        .await
    }
}

fn migrate(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            content     TEXT NOT NULL,
            metadata    TEXT NOT NULL DEFAULT '{}',
            embedding   BLOB NOT NULL,
            collection  TEXT NOT NULL DEFAULT 'default',
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_documents_collection
            ON documents(collection);
        ",
    )?;
    Ok(())
}

fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<VectorDocument> {
    let metadata: String = row.get(2)?;
    let blob: Vec<u8> = row.get(3)?;
    Ok(VectorDocument {
        id: row.get(0)?,
        content: row.get(1)?,
        metadata: serde_json::from_str(&metadata).unwrap_or_else(|_| serde_json::json!({})),
        embedding: decode_embedding(&blob),
        collection: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn load_documents(conn: &mut Connection, collection: Option<&str>) -> Result<Vec<VectorDocument>, StoreError> {
    let base = "SELECT id, content, metadata, embedding, collection, created_at FROM documents";
    let documents = match collection {
        Some(name) => {
            let mut stmt = conn.prepare(&format!("{base} WHERE collection = ?1"))?;
            let rows = stmt.query_map(params![name], row_to_document)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(base)?;
            let rows = stmt.query_map([], row_to_document)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok(documents)
}

/// Score, filter by threshold, sort descending, truncate
pub fn rank(query: &[f32], documents: Vec<VectorDocument>, options: &SearchOptions) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = documents
        .into_iter()
        .map(|doc| {
            let similarity = cosine_similarity(query, &doc.embedding);
            SearchHit {
                id: doc.id,
                content: doc.content,
                metadata: doc.metadata,
                collection: doc.collection,
                similarity,
                created_at: doc.created_at,
            }
        })
        .filter(|hit| hit.similarity >= options.threshold)
        .collect();

    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(options.limit);
    hits
}
