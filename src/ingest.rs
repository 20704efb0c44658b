//! Bulk job ingestion from JSON Lines files.
//!
//! Each line is one [`NewJob`]. Rows with a short description or an
//! already-known external id are skipped, so re-running an ingestion over
//! the same file inserts nothing new. Missing area and seniority are filled
//! by keyword detection.

use std::path::Path;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::matching::MatchingEngine;
use crate::model::NewJob;
use crate::store::RecordStore;

/// Descriptions shorter than this (in characters) are not worth indexing.
pub const MIN_DESCRIPTION_CHARS: usize = 50;

/// Counters of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub read: usize,
    pub inserted: usize,
    pub skipped_short: usize,
    pub skipped_known: usize,
    pub invalid: usize,
}

/// Parse a JSON Lines file of jobs. Blank lines are ignored.
pub async fn read_jobs(path: impl AsRef<Path>, limit: Option<usize>) -> Result<Vec<NewJob>> {
    let path = path.as_ref();
    let file = tokio::fs::File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut jobs = Vec::new();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        if limit.is_some_and(|limit| jobs.len() >= limit) {
            break;
        }
        let job: NewJob = serde_json::from_str(&line).map_err(|e| {
            Error::Validation(format!("{}:{}: {}", path.display(), line_no, e))
        })?;
        jobs.push(job);
    }
    debug!(path = %path.display(), jobs = jobs.len(), "Read job file");
    Ok(jobs)
}

/// Store and index new jobs in batches of `batch_size`.
pub async fn ingest_jobs(
    engine: &MatchingEngine,
    jobs: Vec<NewJob>,
    batch_size: usize,
) -> Result<IngestReport> {
    let mut report = IngestReport {
        read: jobs.len(),
        ..Default::default()
    };
    let total = jobs.len();

    for (batch_no, batch) in jobs.chunks(batch_size.max(1)).enumerate() {
        let mut inserted = Vec::with_capacity(batch.len());
        for job in batch {
            if job.description.trim().chars().count() < MIN_DESCRIPTION_CHARS {
                report.skipped_short += 1;
                continue;
            }
            if let Some(external_id) = job.external_id.as_deref().filter(|e| !e.trim().is_empty()) {
                if engine
                    .store()
                    .find_job_by_external_id(external_id)
                    .await?
                    .is_some()
                {
                    report.skipped_known += 1;
                    continue;
                }
            }
            if let Err(e) = job.validate() {
                warn!(title = %job.title, "Skipping job: {}", e);
                report.invalid += 1;
                continue;
            }
            inserted.push(engine.store().insert_job(job.clone().classify()).await?);
        }

        if !inserted.is_empty() {
            engine.upsert_job_embeddings_batch(&inserted).await?;
            report.inserted += inserted.len();
        }
        info!(
            processed = ((batch_no + 1) * batch_size.max(1)).min(total),
            total,
            inserted = report.inserted,
            "Ingestion progress"
        );
    }
    Ok(report)
}
