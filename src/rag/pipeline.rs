// End-to-end pipeline: decode -> chunk -> index, and question -> search -> answer
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::generator::{Answer, AnswerGenerator};
use crate::documents::{decode, validate_upload, Chunker};
use crate::embedding::Embedder;
use crate::errors::Result;
use crate::index::{segment_metadata, IndexStats, QueryResult, VectorIndex, DEFAULT_TOP_K};

/// Outcome of ingesting one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestOutcome {
    /// Segments were added to the index
    Indexed { filename: String, segments: usize },
    /// A file with this name is already indexed
    AlreadyIndexed { filename: String },
    /// Decoding produced no text
    Empty { filename: String },
}

/// Document question-answering pipeline owning its index
pub struct DocumentPipeline {
    chunker: Chunker,
    index: VectorIndex,
    generator: Box<dyn AnswerGenerator>,
    top_k: usize,
}

impl DocumentPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        generator: Box<dyn AnswerGenerator>,
        chunker: Chunker,
    ) -> Self {
        Self {
            chunker,
            index: VectorIndex::new(embedder),
            generator,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Validate, decode, chunk and index one uploaded file
    pub fn ingest_bytes(&mut self, filename: &str, bytes: &[u8]) -> Result<IngestOutcome> {
        let format = validate_upload(filename, bytes.len() as u64)?;

        if self.index.contains_source(filename) {
            info!(filename, "already indexed, skipping");
            return Ok(IngestOutcome::AlreadyIndexed {
                filename: filename.to_string(),
            });
        }

        let text = decode(bytes, format, filename)?;
        let segments = self.chunker.segments(filename, &text);
        if segments.is_empty() {
            warn!(filename, "document contains no text");
            return Ok(IngestOutcome::Empty {
                filename: filename.to_string(),
            });
        }

        let metadata = segments
            .iter()
            .map(|s| segment_metadata(&s.source_id, s.sequence_index))
            .collect();
        let texts: Vec<String> = segments.into_iter().map(|s| s.text).collect();

        self.index.add(&texts, Some(metadata))?;
        info!(filename, segments = texts.len(), format = format.as_str(), "document indexed");

        Ok(IngestOutcome::Indexed {
            filename: filename.to_string(),
            segments: texts.len(),
        })
    }

    /// Read a file from disk and ingest it under its file name
    pub fn ingest_path(&mut self, path: &Path) -> Result<IngestOutcome> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        // size check before reading the whole file
        validate_upload(&filename, std::fs::metadata(path)?.len())?;
        let bytes = std::fs::read(path)?;
        self.ingest_bytes(&filename, &bytes)
    }

    /// Ranked fragments for `query`
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<QueryResult>> {
        self.index.search(query, k)
    }

    /// Retrieve the top fragments and hand them to the answer generator
    pub async fn query(&self, question: &str) -> Result<Answer> {
        let hits = self.index.search(question, self.top_k)?;
        info!(hits = hits.len(), generator = self.generator.name(), "answering question");
        self.generator.generate(question, &hits).await
    }

    pub fn stats(&self) -> IndexStats {
        self.index.stats()
    }

    pub fn save(&self, location: &Path) -> Result<()> {
        self.index.persist(location)
    }

    pub fn load(&mut self, location: &Path) -> Result<()> {
        self.index.restore(location)
    }

    /// Drop every record, keeping the same embedder
    pub fn reset(&mut self) {
        self.index = VectorIndex::new(Arc::clone(self.index.embedder()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::errors::RagError;
    use crate::rag::generator::ExtractiveGenerator;

    fn pipeline() -> DocumentPipeline {
        DocumentPipeline::new(
            Arc::new(HashingEmbedder::default()),
            Box::new(ExtractiveGenerator),
            Chunker::new(60, 10).unwrap(),
        )
    }

    #[test]
    fn test_ingest_txt() {
        let mut p = pipeline();
        let text = "Cats sleep most of the day. Dogs like long walks in the park. \
                    Parrots can learn to imitate human speech quite well.";
        let outcome = p.ingest_bytes("pets.txt", text.as_bytes()).unwrap();

        let segments = match outcome {
            IngestOutcome::Indexed { segments, .. } => segments,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert!(segments > 1);
        assert_eq!(p.stats().documents, 1);
        assert_eq!(p.stats().chunks, segments);
        assert_eq!(p.index().metadata()[0]["filename"], "pets.txt");
        assert_eq!(p.index().metadata()[1]["chunk_id"], 1);
    }

    #[test]
    fn test_reingest_is_skipped() {
        let mut p = pipeline();
        p.ingest_bytes("a.txt", b"first version").unwrap();
        let outcome = p.ingest_bytes("a.txt", b"second version").unwrap();
        assert!(matches!(outcome, IngestOutcome::AlreadyIndexed { .. }));
        assert_eq!(p.stats().chunks, 1);
    }

    #[test]
    fn test_empty_document() {
        let mut p = pipeline();
        let outcome = p.ingest_bytes("blank.txt", b"  \n\n ").unwrap();
        assert!(matches!(outcome, IngestOutcome::Empty { .. }));
        assert!(p.index().is_empty());
    }

    #[test]
    fn test_unsupported_upload_never_decodes() {
        let mut p = pipeline();
        let err = p.ingest_bytes("image.png", &[0x89, 0x50]).unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn test_query_returns_best_fragment() {
        let mut p = pipeline().with_top_k(2);
        p.ingest_bytes("a.txt", b"The office closes at six in the evening").unwrap();
        p.ingest_bytes("b.txt", b"Invoices are paid within thirty days").unwrap();

        let answer = p.query("when are invoices paid").await.unwrap();
        assert_eq!(answer.answer, "Invoices are paid within thirty days");
        assert_eq!(answer.source_count, 2);
        assert!(answer.confidence > 0.0);
    }

    #[tokio::test]
    async fn test_query_empty_index() {
        let p = pipeline();
        let answer = p.query("anything").await.unwrap();
        assert_eq!(answer.source_count, 0);
        assert_eq!(answer.confidence, 0.0);
    }

    #[test]
    fn test_reset() {
        let mut p = pipeline();
        p.ingest_bytes("a.txt", b"some text").unwrap();
        p.reset();
        assert!(p.index().is_empty());
        assert_eq!(p.index().dimension(), 256);
    }
}
