//! Vector index adapter for job embeddings.
//!
//! Indexes report cosine distance on the fixed range `[0, 2]` (0 = same
//! direction, 2 = opposite). [`similarity_from_distance`] maps that onto a
//! `[0, 1]` similarity shown to users.
//!
//! Backends:
//! - [`MemoryIndex`]: exact brute-force search with JSON snapshots
//! - [`QdrantIndex`]: Qdrant collection over gRPC

mod filter;
mod memory;
mod qdrant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::model::JobRecord;
use crate::search::Embedding;

pub use filter::{FilterExpr, FilterField, SearchFilters};
pub use memory::MemoryIndex;
pub use qdrant::{QdrantIndex, QdrantIndexConfig};

/// Per-vector metadata, returned unmodified by queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub job_id: i64,
    pub title: String,
    pub company: String,
    pub area: String,
    pub seniority: String,
    pub location: String,
}

impl JobMetadata {
    pub fn from_job(job: &JobRecord) -> Self {
        Self {
            job_id: job.id,
            title: job.title.clone(),
            company: job.company.clone(),
            area: job.area.as_str().to_string(),
            seniority: job.seniority.as_str().to_string(),
            location: job.location.clone().unwrap_or_default(),
        }
    }

    pub fn field(&self, field: FilterField) -> &str {
        match field {
            FilterField::Area => &self.area,
            FilterField::Seniority => &self.seniority,
            FilterField::Location => &self.location,
        }
    }
}

/// One upsert unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Embedding,
    pub metadata: JobMetadata,
    /// The composed text the vector was computed from.
    pub document: String,
}

/// One query result.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: String,
    /// Cosine distance in `[0, 2]`.
    pub distance: f32,
    pub metadata: JobMetadata,
    pub document: Option<String>,
}

/// Storage and nearest-neighbor search over job vectors.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace entries by id.
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()>;

    /// Up to `k` nearest neighbors matching `filter`, by ascending distance.
    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&FilterExpr>,
    ) -> Result<Vec<Neighbor>>;

    /// Number of stored vectors.
    async fn count(&self) -> Result<usize>;
}

/// A neighbor with its presentation score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredHit {
    pub embedding_id: String,
    pub job_id: i64,
    pub distance: f32,
    /// `1 - distance / 2`, rounded to 4 decimals.
    pub similarity: f64,
    pub metadata: JobMetadata,
}

/// Round to 4 decimal digits.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Convert a cosine distance in `[0, 2]` into a similarity in `[0, 1]`.
pub fn similarity_from_distance(distance: f64) -> f64 {
    round4(1.0 - distance / 2.0)
}

/// Neighbors to request from an index holding `count` vectors.
///
/// Never more than exist; an empty index is asked for exactly one.
pub fn clamp_k(desired: usize, count: usize) -> usize {
    if count == 0 {
        1
    } else {
        desired.max(1).min(count)
    }
}

/// Filtered kNN search returning scored hits in index order.
pub async fn search(
    index: &dyn VectorIndex,
    vector: &[f32],
    desired: usize,
    filters: &SearchFilters,
) -> Result<Vec<ScoredHit>> {
    let count = index.count().await?;
    let k = clamp_k(desired, count);
    let expr = filters.to_expr();
    debug!(k, count, filtered = expr.is_some(), "Querying vector index");

    let neighbors = index.query(vector, k, expr.as_ref()).await?;
    Ok(neighbors
        .into_iter()
        .map(|neighbor| ScoredHit {
            similarity: similarity_from_distance(f64::from(neighbor.distance)),
            job_id: neighbor.metadata.job_id,
            embedding_id: neighbor.id,
            distance: neighbor.distance,
            metadata: neighbor.metadata,
        })
        .collect())
}
