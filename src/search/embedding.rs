//! FastEmbed-backed embedding service.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{normalize, Embedding, EmbeddingProvider, DEFAULT_MODEL};
use crate::error::{Error, Result};

/// Configuration for [`EmbeddingService`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingServiceConfig {
    /// Model name, e.g. `paraphrase-multilingual-mpnet-base-v2`.
    pub model: String,
    /// Maximum number of query embeddings kept in memory.
    pub cache_capacity: u64,
    /// Texts per inference batch.
    pub batch_size: usize,
    /// Directory where model files are downloaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    pub show_download_progress: bool,
}

impl Default for EmbeddingServiceConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            cache_capacity: 1_000,
            batch_size: 32,
            cache_dir: None,
            show_download_progress: false,
        }
    }
}

/// Resolve a model name to the FastEmbed model and its output dimension.
pub(crate) fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize)> {
    match name.trim().to_lowercase().as_str() {
        "paraphrase-multilingual-mpnet-base-v2" => Ok((EmbeddingModel::ParaphraseMLMpnetBaseV2, 768)),
        "paraphrase-multilingual-minilm-l12-v2" => {
            Ok((EmbeddingModel::ParaphraseMLMiniLML12V2, 384))
        }
        "all-minilm-l6-v2" => Ok((EmbeddingModel::AllMiniLML6V2, 384)),
        "bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
        other => Err(Error::Validation(format!(
            "unsupported embedding model '{}'",
            other
        ))),
    }
}

/// Embedding service running a local ONNX model.
///
/// Inference runs on the blocking thread pool. Single-text embeddings are
/// cached by text, so re-querying a profile's frozen query text skips the
/// model entirely.
pub struct EmbeddingService {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimension: usize,
    batch_size: usize,
    cache: Cache<String, Arc<Embedding>>,
}

impl EmbeddingService {
    /// Load the default model.
    pub fn new() -> Result<Self> {
        Self::with_config(EmbeddingServiceConfig::default())
    }

    /// Load the configured model, downloading it on first use.
    pub fn with_config(config: EmbeddingServiceConfig) -> Result<Self> {
        let (model, dimension) = resolve_model(&config.model)?;
        let mut options =
            InitOptions::new(model).with_show_download_progress(config.show_download_progress);
        if let Some(dir) = config.cache_dir.clone() {
            options = options.with_cache_dir(dir);
        }

        info!(model = %config.model, dimension, "Loading embedding model");
        let text_embedding = TextEmbedding::try_new(options).map_err(|e| {
            Error::Embedding(format!("failed to load model '{}': {}", config.model, e))
        })?;

        Ok(Self {
            model: Arc::new(Mutex::new(text_embedding)),
            model_name: config.model,
            dimension,
            batch_size: config.batch_size.max(1),
            cache: Cache::builder().max_capacity(config.cache_capacity).build(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn encode(&self, texts: Vec<String>) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let expected = texts.len();
        let model = Arc::clone(&self.model);
        let batch_size = self.batch_size;

        let mut vectors = tokio::task::spawn_blocking(move || {
            let model = model
                .lock()
                .map_err(|_| Error::Embedding("embedding model lock poisoned".into()))?;
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| Error::Embedding(e.to_string()))
        })
        .await
        .map_err(|e| Error::Embedding(format!("embedding task failed: {}", e)))??;

        if vectors.len() != expected {
            return Err(Error::Embedding(format!(
                "model returned {} embeddings for {} inputs",
                vectors.len(),
                expected
            )));
        }
        for vector in vectors.iter_mut() {
            if vector.len() != self.dimension {
                return Err(Error::Embedding(format!(
                    "model returned {} dimensions, expected {}",
                    vector.len(),
                    self.dimension
                )));
            }
            normalize(vector);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingService {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        if let Some(hit) = self.cache.get(text).await {
            debug!("Embedding cache hit");
            return Ok(hit.as_ref().clone());
        }
        let vector = self
            .encode(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::Embedding("model returned no embedding".into()))?;
        self.cache
            .insert(text.to_string(), Arc::new(vector.clone()))
            .await;
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        self.encode(texts.to_vec()).await
    }
}
