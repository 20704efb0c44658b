//! Wiring of configured components.

use std::sync::Arc;

use tracing::info;

use crate::config::{AppConfig, EmbeddingBackend, IndexBackend};
use crate::error::Result;
use crate::feedback::FeedbackLedger;
use crate::index::{MemoryIndex, QdrantIndex, VectorIndex};
use crate::indexing::BatchIndexer;
use crate::matching::MatchingEngine;
use crate::search::{EmbeddingProvider, EmbeddingService, HashingEmbedder};
use crate::store::MemoryStore;

/// Everything a command needs, built from one [`AppConfig`].
pub struct AppContext {
    pub config: AppConfig,
    pub engine: MatchingEngine,
    pub ledger: FeedbackLedger,
    store: Arc<MemoryStore>,
    memory_index: Option<Arc<MemoryIndex>>,
}

impl AppContext {
    /// Build the provider, load snapshots and connect the index.
    pub async fn open(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let provider: Arc<dyn EmbeddingProvider> = match config.embedding.backend {
            EmbeddingBackend::Fastembed => {
                let service = EmbeddingService::with_config(config.embedding.fastembed.clone())?;
                info!(model = service.model_name(), "Embedding model loaded");
                Arc::new(service)
            }
            EmbeddingBackend::Hashing => {
                Arc::new(HashingEmbedder::new(config.embedding.hashing_dimension)?)
            }
        };

        let store = Arc::new(MemoryStore::load(&config.store.snapshot_path).await?);

        let mut memory_index = None;
        let index: Arc<dyn VectorIndex> = match config.index.backend {
            IndexBackend::Memory => {
                let memory = Arc::new(MemoryIndex::load(&config.index.snapshot_path).await?);
                memory_index = Some(memory.clone());
                memory
            }
            IndexBackend::Qdrant => Arc::new(
                QdrantIndex::connect(&config.index.qdrant, provider.dimension()).await?,
            ),
        };

        info!(
            embedding = ?config.embedding.backend,
            index = ?config.index.backend,
            dimension = provider.dimension(),
            "Pipeline ready"
        );

        let engine = MatchingEngine::new(provider, index, store.clone())
            .with_max_results(config.matching.max_count);
        let ledger = FeedbackLedger::new(store.clone());

        Ok(Self {
            config,
            engine,
            ledger,
            store,
            memory_index,
        })
    }

    /// A batch indexer using the configured batch size and retry policy.
    pub fn indexer(&self) -> BatchIndexer {
        BatchIndexer::new(self.engine.clone(), &self.config.indexing)
    }

    /// Write the in-process index snapshot, then the store snapshot.
    ///
    /// The store holds the embedding id marks, so it is only written once the
    /// vectors behind them are on disk.
    pub async fn persist(&self) -> Result<()> {
        if let Some(index) = &self.memory_index {
            index.save(&self.config.index.snapshot_path).await?;
        }
        self.store.save(&self.config.store.snapshot_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewJob;
    use crate::store::RecordStore;

    fn offline_config(dir: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.embedding.backend = EmbeddingBackend::Hashing;
        config.embedding.hashing_dimension = 64;
        config.index.snapshot_path = dir.join("index.json");
        config.store.snapshot_path = dir.join("store.json");
        config
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let context = AppContext::open(offline_config(dir.path())).await.unwrap();
        context
            .engine
            .add_job(NewJob {
                title: "Cientista de Dados".into(),
                company: "Acme".into(),
                description: "Modelagem estatística e machine learning em produção".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        context.persist().await.unwrap();

        let reopened = AppContext::open(offline_config(dir.path())).await.unwrap();
        assert_eq!(reopened.engine.index().count().await.unwrap(), 1);
        let job = reopened.engine.store().get_job(1).await.unwrap().unwrap();
        assert_eq!(job.embedding_id.as_deref(), Some("job_1"));
    }

    #[tokio::test]
    async fn test_failed_index_write_leaves_job_unindexed_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("index");
        let mut config = offline_config(dir.path());
        config.index.snapshot_path = index_dir.join("index.json");

        let context = AppContext::open(config.clone()).await.unwrap();
        let job = context
            .engine
            .store()
            .insert_job(NewJob {
                title: "Engenheira de Dados".into(),
                company: "Acme".into(),
                description: "Pipelines de dados com Spark e Airflow em nuvem".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        context.persist().await.unwrap();

        context.engine.upsert_job_embedding(&job).await.unwrap();
        std::fs::remove_dir_all(&index_dir).unwrap();
        std::fs::write(&index_dir, b"not a directory").unwrap();
        assert!(context.persist().await.is_err());

        std::fs::remove_file(&index_dir).unwrap();
        let reopened = AppContext::open(config).await.unwrap();
        assert_eq!(reopened.engine.index().count().await.unwrap(), 0);
        let pending = reopened.engine.store().unindexed_jobs().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, job.id);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = offline_config(dir.path());
        config.matching.max_count = 0;
        assert!(AppContext::open(config).await.is_err());
    }
}
