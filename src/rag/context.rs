// Context builder for grounding an answer prompt in retrieved fragments
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::index::QueryResult;

/// Context assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Maximum tokens for retrieved context
    pub max_context_tokens: usize,
    /// Include filename and score next to each fragment
    pub include_metadata: bool,
    /// Format for context presentation
    pub format: ContextFormat,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: 2000,
            include_metadata: true,
            format: ContextFormat::Structured,
        }
    }
}

/// Format for presenting context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextFormat {
    /// Structured with clear source boundaries
    Structured,
    /// Numbered list format
    Numbered,
}

/// Assembled context for the answer prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledContext {
    /// The formatted context text
    pub text: String,
    /// Number of fragments included
    pub fragment_count: usize,
    /// Estimated token count
    pub estimated_tokens: usize,
}

/// Context builder for assembling retrieved fragments
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    config: ContextConfig,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Build context from ranked hits, stopping at the token budget
    pub fn build(&self, hits: &[QueryResult]) -> AssembledContext {
        let mut parts = Vec::new();
        let mut total_tokens = 0;

        for hit in hits {
            // ~4 chars per token
            let tokens = hit.text.len() / 4;
            if total_tokens + tokens > self.config.max_context_tokens {
                break;
            }

            parts.push(self.format_fragment(parts.len() + 1, hit));
            total_tokens += tokens;
        }

        let text = match self.config.format {
            ContextFormat::Structured => parts.join("\n\n"),
            ContextFormat::Numbered => parts.join("\n"),
        };

        AssembledContext {
            text,
            fragment_count: parts.len(),
            estimated_tokens: total_tokens,
        }
    }

    fn format_fragment(&self, index: usize, hit: &QueryResult) -> String {
        let source = source_label(hit);
        match (self.config.format, self.config.include_metadata) {
            (ContextFormat::Structured, true) => format!(
                "[Source {}] ({}, score: {:.2})\n{}",
                index, source, hit.score, hit.text
            ),
            (ContextFormat::Structured, false) => format!("[Source {}]\n{}", index, hit.text),
            (ContextFormat::Numbered, true) => format!("{}. ({}) {}", index, source, hit.text),
            (ContextFormat::Numbered, false) => format!("{}. {}", index, hit.text),
        }
    }

    /// Full prompt for an answer generator
    pub fn answer_prompt(&self, question: &str, hits: &[QueryResult]) -> String {
        let context = self.build(hits);

        format!(
            "Answer the question using only the context below. If the context does not \
             contain the answer, say that you don't know.\n\n\
             Context:\n{}\n\nQuestion: {}\n\nAnswer:",
            context.text, question
        )
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }
}

/// "filename #chunk" label for a hit, falling back to whatever is present
pub fn source_label(hit: &QueryResult) -> String {
    let filename = hit
        .metadata
        .get("filename")
        .and_then(Value::as_str)
        .unwrap_or("Unknown");

    match hit.metadata.get("chunk_id").and_then(Value::as_u64) {
        Some(chunk) => format!("{} #{}", filename, chunk),
        None => filename.to_string(),
    }
}

/// Citation lines for display, optionally truncated to `max_length` chars
pub fn format_sources(sources: &[String], max_length: Option<usize>) -> Vec<String> {
    sources
        .iter()
        .enumerate()
        .map(|(i, source)| {
            let shown = match max_length {
                Some(max) if source.chars().count() > max => {
                    format!("{}...", source.chars().take(max).collect::<String>())
                }
                _ => source.clone(),
            };
            format!("Source {}: {}", i + 1, shown)
        })
        .collect()
}
