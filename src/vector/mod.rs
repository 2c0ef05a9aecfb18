//! Embedding-backed knowledge store
//!
//! Documents live in a single SQLite table; search is an exhaustive cosine
//! scan done in process.

pub mod similarity;
pub mod store;

pub use similarity::cosine_similarity;
pub use store::{
    CollectionInfo, NewDocument, SearchHit, SearchOptions, StoreError, VectorDocument, VectorStore,
    DEFAULT_COLLECTION,
};
