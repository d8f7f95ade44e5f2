// Retrieval-augmented answering on top of the vector index
//
// Components:
// - Context Builder: assemble retrieved fragments into a prompt
// - Generator: turn question + fragments into an answer
// - Pipeline: ingest documents and answer questions end to end

pub mod context;
pub mod generator;
pub mod pipeline;

// Re-export key types
pub use context::{format_sources, source_label, ContextBuilder, ContextConfig};
pub use generator::{Answer, AnswerGenerator, ExtractiveGenerator, OllamaGenerator};
pub use pipeline::{DocumentPipeline, IngestOutcome};
