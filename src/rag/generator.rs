//! Answer generation
//!
//! Consumers of the index's ranked hits. [`ExtractiveGenerator`] works
//! offline by quoting the best fragment; [`OllamaGenerator`] asks a local
//! Ollama model to answer from the retrieved context.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::context::ContextBuilder;
use crate::errors::{RagError, Result};
use crate::index::QueryResult;

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default answer model
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

/// Generation can be slow on CPU-only hosts
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const NO_CONTEXT_ANSWER: &str =
    "I couldn't find any relevant information in the uploaded documents.";

/// Generated answer with its supporting fragments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    /// Mean retrieval score clamped to [0, 1]
    pub confidence: f32,
    pub source_count: usize,
    /// Fragment texts, best first
    pub sources: Vec<String>,
}

impl Answer {
    /// Answer text plus confidence and sources derived from `hits`
    pub fn from_hits(answer: String, hits: &[QueryResult]) -> Self {
        Self {
            answer,
            confidence: confidence(hits),
            source_count: hits.len(),
            sources: hits.iter().map(|h| h.text.clone()).collect(),
        }
    }

    /// Answer used when nothing was retrieved
    pub fn no_context() -> Self {
        Self::from_hits(NO_CONTEXT_ANSWER.to_string(), &[])
    }
}

/// Mean of the hit scores, clamped to [0, 1]; 0 without hits
pub fn confidence(hits: &[QueryResult]) -> f32 {
    if hits.is_empty() {
        return 0.0;
    }
    let mean = hits.iter().map(|h| h.score).sum::<f32>() / hits.len() as f32;
    mean.clamp(0.0, 1.0)
}

/// Turns a question and its ranked fragments into an answer
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, question: &str, hits: &[QueryResult]) -> Result<Answer>;

    fn name(&self) -> &str;
}

/// Offline generator: answers with the best-scoring fragment verbatim
#[derive(Debug, Clone, Default)]
pub struct ExtractiveGenerator;

#[async_trait]
impl AnswerGenerator for ExtractiveGenerator {
    async fn generate(&self, _question: &str, hits: &[QueryResult]) -> Result<Answer> {
        match hits.first() {
            Some(best) => Ok(Answer::from_hits(best.text.clone(), hits)),
            None => Ok(Answer::no_context()),
        }
    }

    fn name(&self) -> &str {
        "extractive"
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Answers through a local Ollama server (`POST /api/generate`)
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
    context_builder: ContextBuilder,
}

impl OllamaGenerator {
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_OLLAMA_URL, DEFAULT_MODEL)
    }

    pub fn with_config(base_url: &str, model: &str) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            context_builder: ContextBuilder::new(),
        })
    }

    pub fn with_context_builder(mut self, context_builder: ContextBuilder) -> Self {
        self.context_builder = context_builder;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl AnswerGenerator for OllamaGenerator {
    async fn generate(&self, question: &str, hits: &[QueryResult]) -> Result<Answer> {
        if hits.is_empty() {
            return Ok(Answer::no_context());
        }

        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt: self.context_builder.answer_prompt(question, hits),
            stream: false,
        };

        debug!(model = %self.model, fragments = hits.len(), "requesting answer");
        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagError::Generation(format!("HTTP {}: {}", status, body)));
        }

        let generated: GenerateResponse = response.json().await?;
        Ok(Answer::from_hits(generated.response.trim().to_string(), hits))
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
