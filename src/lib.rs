//! DocuMind - document question answering
//!
//! Splits uploaded PDF, DOCX and TXT files into overlapping fragments, embeds
//! them into a cosine-similarity index that can be persisted and restored, and
//! answers questions from the best matching fragments.
//!
//! # Architecture
//!
//! - **documents**: upload validation, decoding and chunking
//! - **embedding**: text to unit vectors (feature hashing or BERT)
//! - **index**: exact nearest-neighbour store with snapshot files
//! - **rag**: context assembly, answer generation and the end-to-end pipeline
//! - **cli**: arguments and TOML configuration for the binary

pub mod errors;
pub mod documents;
pub mod embedding;
pub mod index;
pub mod rag;
pub mod cli;

// Re-export commonly used types
pub use errors::{RagError, Result};
pub use documents::{Chunker, Segment};
pub use embedding::{Embedder, HashingEmbedder};
pub use index::{IndexStats, QueryResult, VectorIndex};
pub use rag::{Answer, DocumentPipeline, IngestOutcome};
