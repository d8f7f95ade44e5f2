//! In-memory exact vector index
//!
//! Records live in three parallel stores (vectors, texts, metadata) that are
//! only ever extended together. Search is a brute-force inner product over
//! unit vectors, which is cosine similarity.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::{snapshot, Metadata};
use crate::embedding::{dot, l2_normalize, Embedder};
use crate::errors::{RagError, Result};

/// Default number of results returned by search
pub const DEFAULT_TOP_K: usize = 5;

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Segment text, verbatim
    pub text: String,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
    pub metadata: Metadata,
}

/// Summary figures for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Distinct `filename` values across all records
    pub documents: usize,
    /// Stored text chunks
    pub chunks: usize,
    /// Vector dimension
    pub dimension: usize,
    /// Stored vectors
    pub index_size: usize,
}

/// Append-only exact nearest-neighbour index
pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    dimension: usize,
    /// Row-major unit vectors, `len() * dimension` values
    vectors: Vec<f32>,
    texts: Vec<String>,
    metadata: Vec<Metadata>,
}

impl VectorIndex {
    /// Create an empty index whose dimension is fixed by the embedder
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        let dimension = embedder.dimension();
        Self {
            embedder,
            dimension,
            vectors: Vec::new(),
            texts: Vec::new(),
            metadata: Vec::new(),
        }
    }

    /// Create an index from a persisted snapshot
    pub fn load(embedder: Arc<dyn Embedder>, location: &Path) -> Result<Self> {
        let mut index = Self::new(embedder);
        index.restore(location)?;
        Ok(index)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn metadata(&self) -> &[Metadata] {
        &self.metadata
    }

    /// Stored unit vector of record `i`
    pub fn vector(&self, i: usize) -> Option<&[f32]> {
        if i >= self.len() {
            return None;
        }
        let start = i * self.dimension;
        Some(&self.vectors[start..start + self.dimension])
    }

    /// Embed and append `segments`.
    ///
    /// Without metadata each record gets `{"index": i}`, `i` being its position
    /// in this call. Either every segment is added or none is.
    pub fn add(&mut self, segments: &[String], metadata: Option<Vec<Metadata>>) -> Result<()> {
        let metadata = match metadata {
            Some(metadata) => {
                if metadata.len() != segments.len() {
                    return Err(RagError::ShapeMismatch {
                        segments: segments.len(),
                        metadata: metadata.len(),
                    });
                }
                metadata
            }
            None => (0..segments.len()).map(positional_metadata).collect(),
        };

        if segments.is_empty() {
            return Ok(());
        }

        let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_batch(&refs)?;
        if embeddings.len() != segments.len() {
            return Err(RagError::Embedding(format!(
                "{} returned {} vectors for {} segments",
                self.embedder.name(),
                embeddings.len(),
                segments.len()
            )));
        }

        let mut batch = Vec::with_capacity(segments.len() * self.dimension);
        for (i, mut vector) in embeddings.into_iter().enumerate() {
            self.check_dimension(&vector)?;
            l2_normalize(&mut vector)
                .map_err(|e| RagError::Embedding(format!("segment {}: {}", i, e)))?;
            batch.extend_from_slice(&vector);
        }

        self.vectors.extend_from_slice(&batch);
        self.texts.extend_from_slice(segments);
        self.metadata.extend(metadata);

        debug!(added = segments.len(), total = self.len(), "indexed segments");
        Ok(())
    }

    /// Top `k` records by cosine similarity to `query`, best first.
    ///
    /// Equal scores keep insertion order. An empty index yields no results.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<QueryResult>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut query_vector = self.embedder.embed(query)?;
        self.check_dimension(&query_vector)?;
        l2_normalize(&mut query_vector)
            .map_err(|e| RagError::Embedding(format!("query: {}", e)))?;

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .map(|stored| dot(&query_vector, stored))
            .enumerate()
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| QueryResult {
                text: self.texts[i].clone(),
                score,
                metadata: self.metadata[i].clone(),
            })
            .collect())
    }

    /// Whether any record came from `filename`
    pub fn contains_source(&self, filename: &str) -> bool {
        self.metadata
            .iter()
            .any(|m| m.get("filename").and_then(Value::as_str) == Some(filename))
    }

    pub fn stats(&self) -> IndexStats {
        let documents: BTreeSet<&str> = self
            .metadata
            .iter()
            .map(|m| m.get("filename").and_then(Value::as_str).unwrap_or("Unknown"))
            .collect();

        IndexStats {
            documents: documents.len(),
            chunks: self.texts.len(),
            dimension: self.dimension,
            index_size: self.vectors.len() / self.dimension.max(1),
        }
    }

    /// Write the full index to `location` (see [`snapshot`])
    pub fn persist(&self, location: &Path) -> Result<()> {
        snapshot::write(
            location,
            self.dimension,
            &self.vectors,
            &self.texts,
            &self.metadata,
        )?;
        info!(records = self.len(), path = %location.display(), "index persisted");
        Ok(())
    }

    /// Replace this index's contents with a snapshot.
    ///
    /// On any error the index is left untouched.
    pub fn restore(&mut self, location: &Path) -> Result<()> {
        let snapshot = snapshot::read(location)?;

        if snapshot.dimension != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                found: snapshot.dimension,
            });
        }

        self.vectors = snapshot.vectors;
        self.texts = snapshot.texts;
        self.metadata = snapshot.metadata;

        info!(records = self.len(), path = %location.display(), "index restored");
        Ok(())
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(RagError::Embedding(format!(
                "{} produced a {}-dimensional vector, index expects {}",
                self.embedder.name(),
                vector.len(),
                self.dimension
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("embedder", &self.embedder.name())
            .field("dimension", &self.dimension)
            .field("records", &self.len())
            .finish()
    }
}

fn positional_metadata(index: usize) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("index".to_string(), Value::from(index));
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{Embedding, HashingEmbedder};
    use crate::index::segment_metadata;
    use tempfile::TempDir;

    /// Maps known texts to fixed vectors
    struct TableEmbedder;

    impl Embedder for TableEmbedder {
        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
            Ok(texts
                .iter()
                .map(|t| match *t {
                    "x" => vec![2.0, 0.0, 0.0],
                    "y" => vec![0.0, 3.0, 0.0],
                    "xy" => vec![1.0, 1.0, 0.0],
                    "zero" => vec![0.0, 0.0, 0.0],
                    "short" => vec![1.0, 0.0],
                    _ => vec![0.0, 0.0, 1.0],
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            3
        }

        fn name(&self) -> &str {
            "table"
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn table_index() -> VectorIndex {
        VectorIndex::new(Arc::new(TableEmbedder))
    }

    #[test]
    fn test_new_index_is_empty() {
        let index = table_index();
        assert!(index.is_empty());
        assert_eq!(index.dimension(), 3);
        assert!(index.search("x", 5).unwrap().is_empty());
    }

    #[test]
    fn test_add_normalizes_vectors() {
        let mut index = table_index();
        index.add(&strings(&["x", "y", "xy"]), None).unwrap();

        for i in 0..index.len() {
            let norm: f32 = index.vector(i).unwrap().iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
        assert!(index.vector(3).is_none());
    }

    #[test]
    fn test_positional_metadata_restarts_per_call() {
        let mut index = table_index();
        index.add(&strings(&["x", "y"]), None).unwrap();
        index.add(&strings(&["xy"]), None).unwrap();
        assert_eq!(index.metadata()[1]["index"], 1);
        assert_eq!(index.metadata()[2]["index"], 0);
    }

    #[test]
    fn test_shape_mismatch_leaves_index_unchanged() {
        let mut index = table_index();
        index.add(&strings(&["x"]), None).unwrap();

        let metadata = vec![segment_metadata("a.txt", 0), segment_metadata("a.txt", 1)];
        let err = index
            .add(&strings(&["x", "y", "xy"]), Some(metadata))
            .unwrap_err();

        assert!(matches!(err, RagError::ShapeMismatch { segments: 3, metadata: 2 }));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_zero_vector_rejects_whole_batch() {
        let mut index = table_index();
        let err = index.add(&strings(&["x", "zero", "y"]), None).unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
        assert!(index.is_empty());
        assert_eq!(index.stats().index_size, 0);
    }

    #[test]
    fn test_wrong_dimension_rejects_batch() {
        let mut index = table_index();
        let err = index.add(&strings(&["x", "short"]), None).unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
        assert!(index.is_empty());
    }

    #[test]
    fn test_search_orders_by_score() {
        let mut index = table_index();
        index.add(&strings(&["y", "xy", "x", "other"]), None).unwrap();

        let results = index.search("x", 10).unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].text, "x");
        assert!((results[0].score - 1.0).abs() < 1e-5);
        assert_eq!(results[1].text, "xy");
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_search_ties_keep_insertion_order() {
        let mut index = table_index();
        index.add(&strings(&["y", "other", "y"]), None).unwrap();

        let results = index.search("x", 3).unwrap();
        // every record scores 0.0 against "x"
        let positions: Vec<_> = results.iter().map(|r| r.metadata["index"].clone()).collect();
        assert_eq!(positions, vec![Value::from(0), Value::from(1), Value::from(2)]);
    }

    #[test]
    fn test_search_truncates_to_k() {
        let mut index = table_index();
        index.add(&strings(&["x", "y", "xy"]), None).unwrap();
        assert_eq!(index.search("x", 2).unwrap().len(), 2);
        assert!(index.search("x", 0).unwrap().is_empty());
    }

    #[test]
    fn test_zero_query_is_error() {
        let mut index = table_index();
        index.add(&strings(&["x"]), None).unwrap();
        assert!(matches!(index.search("zero", 1), Err(RagError::Embedding(_))));
    }

    #[test]
    fn test_stats_and_sources() {
        let mut index = VectorIndex::new(Arc::new(HashingEmbedder::default()));
        let metadata = vec![
            segment_metadata("a.txt", 0),
            segment_metadata("a.txt", 1),
            segment_metadata("b.pdf", 0),
        ];
        index
            .add(&strings(&["alpha one", "alpha two", "beta"]), Some(metadata))
            .unwrap();

        let stats = index.stats();
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.chunks, 3);
        assert_eq!(stats.index_size, 3);
        assert_eq!(stats.dimension, 256);
        assert!(index.contains_source("b.pdf"));
        assert!(!index.contains_source("c.docx"));
    }

    #[test]
    fn test_restore_dimension_mismatch_keeps_state() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("index");

        let mut small = VectorIndex::new(Arc::new(HashingEmbedder::new(8).unwrap()));
        small.add(&strings(&["alpha"]), None).unwrap();
        small.persist(&location).unwrap();

        let mut index = table_index();
        index.add(&strings(&["x"]), None).unwrap();
        let err = index.restore(&location).unwrap_err();

        assert!(matches!(err, RagError::DimensionMismatch { expected: 3, found: 8 }));
        assert_eq!(index.texts(), &["x".to_string()]);
    }

    #[test]
    fn test_restore_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let mut index = table_index();
        index.add(&strings(&["x"]), None).unwrap();

        let err = index.restore(&temp.path().join("nothing")).unwrap_err();
        assert!(matches!(err, RagError::NotFound(_)));
        assert_eq!(index.len(), 1);
    }
}
