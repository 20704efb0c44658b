//! Application configuration.
//!
//! Loaded from a TOML file; every section and field has a default, so a
//! partial file (or none at all) is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::QdrantIndexConfig;
use crate::indexing::IndexingConfig;
use crate::matching::{DEFAULT_RECOMMENDATIONS, MAX_RECOMMENDATIONS};
use crate::search::{EmbeddingServiceConfig, EMBEDDING_DIM};

/// Embedding implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local ONNX model through FastEmbed.
    #[default]
    Fastembed,
    /// Feature hashing; no model download.
    Hashing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Vector length of the hashing backend.
    pub hashing_dimension: usize,
    pub fastembed: EmbeddingServiceConfig,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            hashing_dimension: EMBEDDING_DIM,
            fastembed: EmbeddingServiceConfig::default(),
        }
    }
}

/// Vector index implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// In-process index persisted to `snapshot_path`.
    #[default]
    Memory,
    Qdrant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub backend: IndexBackend,
    pub snapshot_path: PathBuf,
    pub qdrant: QdrantIndexConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::default(),
            snapshot_path: PathBuf::from("data/index.json"),
            qdrant: QdrantIndexConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub snapshot_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("data/store.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Result count when a request names none.
    pub default_count: usize,
    /// Largest result count a request may ask for.
    pub max_count: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            default_count: DEFAULT_RECOMMENDATIONS,
            max_count: MAX_RECOMMENDATIONS,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub store: StoreConfig,
    pub indexing: IndexingConfig,
    pub matching: MatchingConfig,
}

impl AppConfig {
    /// Read and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding.backend == EmbeddingBackend::Hashing
            && self.embedding.hashing_dimension == 0
        {
            return Err(Error::Validation(
                "embedding.hashing_dimension must be positive".into(),
            ));
        }
        if self.embedding.fastembed.batch_size == 0 {
            return Err(Error::Validation(
                "embedding.fastembed.batch_size must be positive".into(),
            ));
        }
        self.indexing.validate()?;
        if self.matching.max_count == 0 {
            return Err(Error::Validation(
                "matching.max_count must be positive".into(),
            ));
        }
        if self.matching.default_count == 0 || self.matching.default_count > self.matching.max_count
        {
            return Err(Error::Validation(format!(
                "matching.default_count must be between 1 and {}",
                self.matching.max_count
            )));
        }
        if self.index.backend == IndexBackend::Qdrant && self.index.qdrant.collection.is_empty() {
            return Err(Error::Validation(
                "index.qdrant.collection must not be empty".into(),
            ));
        }
        Ok(())
    }
}
