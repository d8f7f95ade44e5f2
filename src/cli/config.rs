//! Configuration management for DocuMind
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.documind/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::documents::chunker::{Chunker, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use crate::embedding::{engine::DEFAULT_MODEL_ID, hashing::DEFAULT_HASHING_DIM};
use crate::embedding::{BertEmbedder, Embedder, HashingEmbedder};
use crate::errors::{RagError, Result};
use crate::index::DEFAULT_TOP_K;
use crate::rag::generator::{DEFAULT_MODEL, DEFAULT_OLLAMA_URL};
use crate::rag::{AnswerGenerator, ExtractiveGenerator, OllamaGenerator};

/// Complete configuration for DocuMind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub generator: GeneratorConfig,
    pub paths: PathsConfig,
}

/// Chunker parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

/// Search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

/// Which embedding backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Hashing,
    Bert,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Hugging Face model id for the bert backend
    pub model_id: String,
    /// Vector length for the hashing backend
    pub dimension: usize,
}

/// Which answer generator to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorBackend {
    Extractive,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub backend: GeneratorBackend,
    pub ollama_url: String,
    pub model: String,
}

/// File system paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: String,
    /// Base name of the snapshot files inside `data_dir`
    pub snapshot_name: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Hashing,
            model_id: DEFAULT_MODEL_ID.to_string(),
            dimension: DEFAULT_HASHING_DIM,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            backend: GeneratorBackend::Extractive,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.documind".to_string(),
            snapshot_name: "index".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(config_path) => Self::load_from_file(config_path),
            None => Self::load_default(),
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RagError::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| RagError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from ~/.documind/config.toml if present, else built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }
        Ok(Config::default())
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".documind").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(RagError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(RagError::Config(
                "overlap must be less than chunk_size".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than 0".to_string()));
        }

        if self.embedding.backend == EmbeddingBackend::Hashing && self.embedding.dimension == 0 {
            return Err(RagError::Config(
                "embedding dimension must be greater than 0".to_string(),
            ));
        }

        if self.paths.snapshot_name.trim().is_empty() {
            return Err(RagError::Config("snapshot_name is required".to_string()));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RagError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RagError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| RagError::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.data_dir)
    }

    /// Base location of the index snapshot
    pub fn snapshot_location(&self) -> PathBuf {
        self.data_dir().join(&self.paths.snapshot_name)
    }

    pub fn chunker(&self) -> Result<Chunker> {
        Chunker::new(self.chunking.chunk_size, self.chunking.overlap)
    }

    /// Instantiate the configured embedder (may download a model)
    pub fn embedder(&self) -> Result<Arc<dyn Embedder>> {
        match self.embedding.backend {
            EmbeddingBackend::Hashing => {
                Ok(Arc::new(HashingEmbedder::new(self.embedding.dimension)?))
            }
            EmbeddingBackend::Bert => Ok(Arc::new(BertEmbedder::from_hub(
                &self.embedding.model_id,
            )?)),
        }
    }

    /// Instantiate the configured answer generator
    pub fn generator(&self) -> Result<Box<dyn AnswerGenerator>> {
        match self.generator.backend {
            GeneratorBackend::Extractive => Ok(Box::new(ExtractiveGenerator)),
            GeneratorBackend::Ollama => Ok(Box::new(OllamaGenerator::with_config(
                &self.generator.ollama_url,
                &self.generator.model,
            )?)),
        }
    }
}
