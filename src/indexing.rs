//! Background batch indexing.
//!
//! Picks up every job without an embedding id and indexes it in fixed-size
//! batches. Each batch is marked in the store only after its upsert
//! succeeded, so a retry after a partial failure resumes with the jobs that
//! are still unindexed.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::matching::MatchingEngine;
use crate::metrics;
use crate::store::RecordStore;

/// Batch indexing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    /// Jobs per embedding call and index upsert.
    pub batch_size: usize,
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay_secs: u64,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_retries: 3,
            retry_delay_secs: 60,
        }
    }
}

impl IndexingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Validation(
                "indexing batch_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a successful indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexingReport {
    /// Jobs indexed by the final, successful attempt.
    pub indexed: usize,
    pub batches: usize,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

/// Indexes all unindexed jobs with bounded retries.
pub struct BatchIndexer {
    engine: MatchingEngine,
    batch_size: usize,
    max_retries: u32,
    retry_delay: Duration,
}

impl BatchIndexer {
    pub fn new(engine: MatchingEngine, config: &IndexingConfig) -> Self {
        Self {
            engine,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Run to completion, retrying transient failures.
    ///
    /// Validation-type errors and the error of the last allowed attempt are
    /// returned as-is.
    pub async fn run(&self) -> Result<IndexingReport> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.index_pending().await {
                Ok(mut report) => {
                    report.attempts = attempt;
                    info!(
                        indexed = report.indexed,
                        batches = report.batches,
                        attempts = attempt,
                        "Batch indexing finished"
                    );
                    return Ok(report);
                }
                Err(e) if e.is_retryable() && attempt <= self.max_retries => {
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        delay_secs = self.retry_delay.as_secs(),
                        "Batch indexing failed, retrying: {}",
                        e
                    );
                    metrics::record_indexing_retry();
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    error!(attempt, "Batch indexing failed: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// Run on the tokio runtime.
    pub fn spawn(self) -> JoinHandle<Result<IndexingReport>> {
        tokio::spawn(async move { self.run().await })
    }

    async fn index_pending(&self) -> Result<IndexingReport> {
        let pending = self.engine.store().unindexed_jobs().await?;
        debug!(pending = pending.len(), batch_size = self.batch_size, "Indexing pending jobs");

        let mut report = IndexingReport::default();
        for chunk in pending.chunks(self.batch_size) {
            let ids = self.engine.upsert_job_embeddings_batch(chunk).await?;
            report.indexed += ids.len();
            report.batches += 1;
            debug!(batch = report.batches, jobs = ids.len(), "Batch indexed");
        }
        Ok(report)
    }
}
