//! Local Embeddings using Feature Hashing
//!
//! Uses the hashing trick to produce fixed-size vectors without maintaining
//! a vocabulary map. Embeddings are stable: the same text always produces
//! the same vector, across runs and across builds, so persisted snapshots stay
//! searchable.

use super::{Embedder, Embedding};
use crate::errors::{RagError, Result};

/// Default dimensionality of hashed vectors
pub const DEFAULT_HASHING_DIM: usize = 256;

const HASH_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Feature-hashing embedder (term frequencies over hashed buckets)
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_HASHING_DIM,
        }
    }
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::Config(
                "embedding dimension must be greater than 0".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    /// Term-frequency vector of lowercase alphanumeric tokens.
    ///
    /// Text without any token yields the zero vector; the index rejects it.
    pub fn embed_text(&self, text: &str) -> Embedding {
        let mut tf = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            let idx = (hash_token(&token) % self.dimension as u64) as usize;
            tf[idx] += 1.0;
        }

        tf
    }
}

impl Embedder for HashingEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hashing"
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

/// Seeded multiply-rotate mix; std's hasher is not stable across releases.
fn hash_token(token: &str) -> u64 {
    let bytes = token.as_bytes();
    let mut hash = HASH_SEED ^ bytes.len() as u64;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x1000_0000_01B3);
        hash = hash.rotate_left(13);
        hash = hash.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    }
    hash ^ (hash >> 33)
}
