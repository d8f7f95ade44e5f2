//! Document handling
//!
//! Decoding of uploaded files and chunking of their text.

pub mod chunker;
pub mod decoder;

pub use chunker::{chunk_text, normalize_whitespace, Chunker, Segment};
pub use decoder::{decode, decode_document, validate_upload, DocumentFormat, MAX_UPLOAD_BYTES};
