//! Error types for DocuMind
//!
//! Every failure in decoding, chunking, indexing and answer generation is
//! surfaced as a [`RagError`] carrying enough context (file, operation) for a
//! user-facing message.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the retrieval pipeline
#[derive(Error, Debug)]
pub enum RagError {
    /// File type outside {pdf, txt, docx}
    #[error("Unsupported file format '{extension}' for {filename} (supported: .pdf, .txt, .docx)")]
    UnsupportedFormat { filename: String, extension: String },

    /// File bytes could not be parsed
    #[error("Failed to decode {filename}: {reason}")]
    Decode { filename: String, reason: String },

    /// Upload exceeds the size limit
    #[error("File {filename} is too large: {size} bytes (max {max} bytes)")]
    FileTooLarge { filename: String, size: u64, max: u64 },

    /// Embedding function returned unusable vectors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Caller supplied metadata that does not line up with the segments
    #[error("Shape mismatch: {segments} segments but {metadata} metadata entries")]
    ShapeMismatch { segments: usize, metadata: usize },

    /// No snapshot at the given location
    #[error("Snapshot not found: {0}")]
    NotFound(PathBuf),

    /// Snapshot exists but is inconsistent or malformed
    #[error("Corrupt snapshot data: {0}")]
    CorruptData(String),

    /// Snapshot was built with a different embedding dimension
    #[error("Dimension mismatch: index expects {expected}, snapshot has {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Answer generator failures
    #[error("Answer generation failed: {0}")]
    Generation(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RagError>;

impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Embedding(format!("{:#}", err))
    }
}
