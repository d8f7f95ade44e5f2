//! Retrieval index
//!
//! Stores embedded segments with their text and metadata and answers exact
//! cosine-similarity queries. Snapshots persist the full state to disk.
//!
//! Metadata is an open key/value map. Records added by the ingestion pipeline
//! always carry `filename` and `chunk_id`, which citations rely on.

pub mod snapshot;
pub mod store;

pub use store::{IndexStats, QueryResult, VectorIndex, DEFAULT_TOP_K};

use serde_json::Value;

/// Per-record metadata
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata for segment `chunk_id` of `filename`
pub fn segment_metadata(filename: &str, chunk_id: usize) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("filename".to_string(), Value::from(filename));
    metadata.insert("chunk_id".to_string(), Value::from(chunk_id));
    metadata
}
