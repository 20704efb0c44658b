//! In-process exact vector index.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{FilterExpr, IndexEntry, Neighbor, VectorIndex};
use crate::error::{Error, Result};
use crate::search::cosine_similarity;

/// Brute-force cosine index.
///
/// Entries are keyed by id in a sorted map, so equal distances are always
/// returned in id order.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    entries: RwLock<BTreeMap<String, IndexEntry>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot written by [`MemoryIndex::save`]; a missing file yields an empty index.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            debug!(path = %path.display(), "No index snapshot, starting empty");
            return Ok(Self::new());
        }
        let raw = tokio::fs::read(path).await?;
        let entries: Vec<IndexEntry> = serde_json::from_slice(&raw)?;
        info!(path = %path.display(), entries = entries.len(), "Loaded index snapshot");
        let map = entries
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect();
        Ok(Self {
            entries: RwLock::new(map),
        })
    }

    /// Write all entries to `path`, replacing it atomically.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let raw = {
            let entries = self.entries.read().await;
            let list: Vec<&IndexEntry> = entries.values().collect();
            serde_json::to_vec(&list)?
        };
        crate::store::write_atomically(path, &raw).await
    }

    /// Stored entry by id.
    pub async fn get(&self, id: &str) -> Option<IndexEntry> {
        self.entries.read().await.get(id).cloned()
    }

    fn dimension_of(entries: &BTreeMap<String, IndexEntry>) -> Option<usize> {
        entries.values().next().map(|entry| entry.vector.len())
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, batch: Vec<IndexEntry>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut entries = self.entries.write().await;
        let expected = Self::dimension_of(&entries).unwrap_or(batch[0].vector.len());
        if let Some(bad) = batch.iter().find(|entry| entry.vector.len() != expected) {
            return Err(Error::Validation(format!(
                "entry '{}' has {} dimensions, index holds {}",
                bad.id,
                bad.vector.len(),
                expected
            )));
        }
        for entry in batch {
            entries.insert(entry.id.clone(), entry);
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&FilterExpr>,
    ) -> Result<Vec<Neighbor>> {
        let entries = self.entries.read().await;
        if let Some(expected) = Self::dimension_of(&entries) {
            if vector.len() != expected {
                return Err(Error::Validation(format!(
                    "query has {} dimensions, index holds {}",
                    vector.len(),
                    expected
                )));
            }
        }

        let mut scored: Vec<(f32, &IndexEntry)> = entries
            .values()
            .filter(|entry| filter.map_or(true, |expr| expr.matches(&entry.metadata)))
            .map(|entry| {
                let distance = (1.0 - cosine_similarity(vector, &entry.vector)).clamp(0.0, 2.0);
                (distance, entry)
            })
            .collect();
        // Stable sort keeps id order for equal distances.
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(distance, entry)| Neighbor {
                id: entry.id.clone(),
                distance,
                metadata: entry.metadata.clone(),
                document: Some(entry.document.clone()),
            })
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{FilterField, JobMetadata};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    fn entry(id: i64, vector: Vec<f32>, area: &str) -> IndexEntry {
        IndexEntry {
            id: format!("job_{}", id),
            vector,
            metadata: JobMetadata {
                job_id: id,
                title: format!("title {}", id),
                company: "Acme".into(),
                area: area.into(),
                seniority: "mid".into(),
                location: "São Paulo".into(),
            },
            document: format!("doc {}", id),
        }
    }

    #[tokio::test]
    async fn test_query_orders_by_distance() {
        let index = MemoryIndex::new();
        index
            .upsert(vec![
                entry(1, vec![0.0, 1.0], "dados"),
                entry(2, vec![1.0, 0.0], "dados"),
                entry(3, vec![0.7071, 0.7071], "dados"),
            ])
            .await
            .unwrap();

        let hits = index.query(&[1.0, 0.0], 3, None).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["job_2", "job_3", "job_1"]);
        assert!(hits[0].distance.abs() < 1e-6);
        assert!((hits[2].distance - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_opposite_vectors_have_distance_two() {
        let index = MemoryIndex::new();
        index
            .upsert(vec![entry(1, vec![-1.0, 0.0], "dados")])
            .await
            .unwrap();
        let hits = index.query(&[1.0, 0.0], 1, None).await.unwrap();
        assert!((hits[0].distance - 2.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let index = MemoryIndex::new();
        index
            .upsert(vec![entry(1, vec![1.0, 0.0], "dados")])
            .await
            .unwrap();
        let mut updated = entry(1, vec![0.0, 1.0], "design");
        updated.metadata.title = "renamed".into();
        index.upsert(vec![updated]).await.unwrap();

        assert_eq!(index.count().await.unwrap(), 1);
        let hits = index.query(&[0.0, 1.0], 5, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.title, "renamed");
        assert_eq!(hits[0].metadata.area, "design");
    }

    #[tokio::test]
    async fn test_filter_is_applied_before_truncation() {
        let index = MemoryIndex::new();
        index
            .upsert(vec![
                entry(1, vec![1.0, 0.0], "design"),
                entry(2, vec![0.9, 0.1], "dados"),
                entry(3, vec![0.0, 1.0], "dados"),
            ])
            .await
            .unwrap();
        let filter = FilterExpr::Eq {
            field: FilterField::Area,
            value: "dados".into(),
        };
        let hits = index.query(&[1.0, 0.0], 2, Some(&filter)).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["job_2", "job_3"]);
    }

    #[tokio::test]
    async fn test_ties_break_by_id() {
        let index = MemoryIndex::new();
        index
            .upsert(vec![
                entry(9, vec![1.0, 0.0], "dados"),
                entry(4, vec![1.0, 0.0], "dados"),
                entry(5, vec![1.0, 0.0], "dados"),
            ])
            .await
            .unwrap();
        let hits = index.query(&[1.0, 0.0], 3, None).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["job_4", "job_5", "job_9"]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let index = MemoryIndex::new();
        index
            .upsert(vec![entry(1, vec![1.0, 0.0], "dados")])
            .await
            .unwrap();
        let err = index
            .upsert(vec![entry(2, vec![1.0, 0.0, 0.0], "dados")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(index.query(&[1.0], 1, None).await.is_err());
    }

    #[tokio::test]
    async fn test_random_queries_return_unique_sorted_ids() {
        let mut rng = StdRng::seed_from_u64(7);
        let index = MemoryIndex::new();
        let entries = (0..50)
            .map(|id| {
                let v: Vec<f32> = (0..8).map(|_| rng.gen_range(-1.0..1.0)).collect();
                entry(id, v, "dados")
            })
            .collect();
        index.upsert(entries).await.unwrap();

        let query: Vec<f32> = (0..8).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let hits = index.query(&query, 20, None).await.unwrap();
        assert_eq!(hits.len(), 20);
        let unique: HashSet<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(unique.len(), 20);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert!(hits.iter().all(|h| (0.0..=2.0).contains(&h.distance)));
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let index = MemoryIndex::new();
        index
            .upsert(vec![
                entry(1, vec![1.0, 0.0], "dados"),
                entry(2, vec![0.0, 1.0], "design"),
            ])
            .await
            .unwrap();
        index.save(&path).await.unwrap();

        let restored = MemoryIndex::load(&path).await.unwrap();
        assert_eq!(restored.count().await.unwrap(), 2);
        assert_eq!(restored.get("job_2").await, index.get("job_2").await);
    }

    #[tokio::test]
    async fn test_load_missing_snapshot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index = MemoryIndex::load(dir.path().join("absent.json"))
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }
}
