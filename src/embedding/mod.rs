//! Embedding backends
//!
//! The index only needs a batch `texts -> vectors` function with a fixed
//! dimension. Two backends are provided:
//! - [`HashingEmbedder`]: deterministic feature hashing, no model download
//! - [`BertEmbedder`]: sentence-transformers BERT model run with candle

pub mod engine;
pub mod hashing;

pub use engine::BertEmbedder;
pub use hashing::HashingEmbedder;

use crate::errors::{RagError, Result};

/// Embedding vector
pub type Embedding = Vec<f32>;

/// Batch embedding function with a fixed output dimension
pub trait Embedder: Send + Sync {
    /// Embed every text, returning one vector per input in the same order
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Length of every vector this embedder produces
    fn dimension(&self) -> usize;

    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| RagError::Embedding("embedder returned no vector".to_string()))
    }
}

/// Scale `vector` to unit L2 norm in place.
///
/// Zero-norm and non-finite vectors are rejected, since they have no direction
/// to compare by cosine similarity.
pub fn l2_normalize(vector: &mut [f32]) -> Result<()> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();

    if !norm.is_finite() {
        return Err(RagError::Embedding(
            "vector contains non-finite components".to_string(),
        ));
    }
    if norm == 0.0 {
        return Err(RagError::Embedding("vector has zero norm".to_string()));
    }

    for x in vector.iter_mut() {
        *x /= norm;
    }
    Ok(())
}

/// Inner product of two equal-length vectors
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v).unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_rejects_zero() {
        let mut v = vec![0.0; 4];
        assert!(matches!(l2_normalize(&mut v), Err(RagError::Embedding(_))));
    }

    #[test]
    fn test_l2_normalize_rejects_nan() {
        let mut v = vec![1.0, f32::NAN];
        assert!(l2_normalize(&mut v).is_err());
    }

    #[test]
    fn test_dot() {
        assert_eq!(dot(&[1.0, 0.0, 2.0], &[0.5, 1.0, 1.0]), 2.5);
    }
}
