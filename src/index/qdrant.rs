//! Qdrant-backed vector index.
//!
//! Qdrant reports cosine *similarity* scores in `[-1, 1]`; they are mapped
//! back to the `[0, 2]` distance convention (`1 - score`) so callers see the
//! same numbers as with any other backend. Point ids are the job primary
//! keys; the `job_<id>` embedding id travels in the payload.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, Distance, Filter, PointStruct, Query,
    QueryPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{FilterExpr, IndexEntry, JobMetadata, Neighbor, VectorIndex};
use crate::error::{Error, Result};
use crate::model::embedding_id_for;

/// Default Qdrant gRPC endpoint.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Default collection holding job vectors.
pub const DEFAULT_COLLECTION: &str = "jobs";

/// Connection settings for [`QdrantIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantIndexConfig {
    pub url: String,
    pub collection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for QdrantIndexConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_QDRANT_URL.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            api_key: None,
        }
    }
}

fn unavailable(err: impl std::fmt::Display) -> Error {
    Error::IndexUnavailable(err.to_string())
}

/// Vector index stored in a Qdrant collection with cosine distance.
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
}

impl QdrantIndex {
    /// Connect and make sure the collection exists with `dimension`-sized vectors.
    pub async fn connect(config: &QdrantIndexConfig, dimension: usize) -> Result<Self> {
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(key) = &config.api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder.build().map_err(unavailable)?;
        let index = Self {
            client,
            collection: config.collection.clone(),
        };
        index.ensure_collection(dimension).await?;
        Ok(index)
    }

    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let exists = self
            .client
            .collection_exists(self.collection.clone())
            .await
            .map_err(unavailable)?;
        if !exists {
            info!(collection = %self.collection, dimension, "Creating Qdrant collection");
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(self.collection.clone()).vectors_config(
                        VectorParamsBuilder::new(dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(unavailable)?;
        }
        Ok(())
    }
}

fn to_point(entry: IndexEntry) -> Result<PointStruct> {
    let point_id = u64::try_from(entry.metadata.job_id).map_err(|_| {
        Error::Validation(format!(
            "job id {} cannot be used as a point id",
            entry.metadata.job_id
        ))
    })?;
    let payload = Payload::try_from(serde_json::json!({
        "embedding_id": entry.id,
        "job_id": entry.metadata.job_id,
        "title": entry.metadata.title,
        "company": entry.metadata.company,
        "area": entry.metadata.area,
        "seniority": entry.metadata.seniority,
        "location": entry.metadata.location,
        "document": entry.document,
    }))
    .map_err(|e| Error::Validation(format!("invalid payload: {}", e)))?;
    Ok(PointStruct::new(point_id, entry.vector, payload))
}

fn collect_conditions(expr: &FilterExpr, out: &mut Vec<Condition>) {
    match expr {
        FilterExpr::Eq { field, value } => out.push(Condition::matches(field.key(), value.clone())),
        // Without a full-text index on the field this is a plain substring match.
        FilterExpr::Contains { field, value } => {
            out.push(Condition::matches_text(field.key(), value.clone()))
        }
        FilterExpr::And(inner) => {
            for expr in inner {
                collect_conditions(expr, out);
            }
        }
    }
}

/// Translate a predicate into a Qdrant filter where every condition must hold.
pub(crate) fn to_filter(expr: &FilterExpr) -> Filter {
    let mut conditions = Vec::new();
    collect_conditions(expr, &mut conditions);
    Filter::must(conditions)
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> String {
    match payload.get(key).and_then(|value| value.kind.as_ref()) {
        Some(Kind::StringValue(text)) => text.clone(),
        _ => String::new(),
    }
}

fn payload_i64(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
    match payload.get(key).and_then(|value| value.kind.as_ref()) {
        Some(Kind::IntegerValue(number)) => Some(*number),
        Some(Kind::StringValue(text)) => text.parse().ok(),
        _ => None,
    }
}

/// Cosine distance on `[0, 2]` from a Qdrant cosine score.
pub(crate) fn distance_from_score(score: f32) -> f32 {
    (1.0 - score).clamp(0.0, 2.0)
}

fn to_neighbor(payload: &HashMap<String, Value>, score: f32) -> Option<Neighbor> {
    let job_id = payload_i64(payload, "job_id")?;
    let id = Some(payload_string(payload, "embedding_id"))
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| embedding_id_for(job_id));
    let document = Some(payload_string(payload, "document")).filter(|doc| !doc.is_empty());
    Some(Neighbor {
        id,
        distance: distance_from_score(score),
        metadata: JobMetadata {
            job_id,
            title: payload_string(payload, "title"),
            company: payload_string(payload, "company"),
            area: payload_string(payload, "area"),
            seniority: payload_string(payload, "seniority"),
            location: payload_string(payload, "location"),
        },
        document,
    })
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let points = entries
            .into_iter()
            .map(to_point)
            .collect::<Result<Vec<_>>>()?;
        self.client
            .upsert_points(UpsertPointsBuilder::new(self.collection.clone(), points).wait(true))
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&FilterExpr>,
    ) -> Result<Vec<Neighbor>> {
        let mut request = QueryPointsBuilder::new(self.collection.clone())
            .query(Query::new_nearest(vector.to_vec()))
            .limit(k as u64)
            .with_payload(true);
        if let Some(expr) = filter {
            request = request.filter(to_filter(expr));
        }
        let response = self.client.query(request).await.map_err(unavailable)?;
        Ok(response
            .result
            .iter()
            .filter_map(|point| to_neighbor(&point.payload, point.score))
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        let response = self
            .client
            .count(CountPointsBuilder::new(self.collection.clone()).exact(true))
            .await
            .map_err(unavailable)?;
        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{FilterField, SearchFilters};
    use crate::taxonomy::Area;

    fn string_value(text: &str) -> Value {
        Value {
            kind: Some(Kind::StringValue(text.to_string())),
        }
    }

    #[test]
    fn test_score_maps_to_distance_convention() {
        assert_eq!(distance_from_score(1.0), 0.0);
        assert_eq!(distance_from_score(-1.0), 2.0);
        assert!((distance_from_score(0.6) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_filter_translation_flattens_conjunction() {
        let filters = SearchFilters {
            area: Some(Area::Dados),
            location: Some("Recife".into()),
            ..Default::default()
        };
        let filter = to_filter(&filters.to_expr().unwrap());
        assert_eq!(filter.must.len(), 2);
        assert!(filter.should.is_empty());
    }

    #[test]
    fn test_single_predicate_filter() {
        let filter = to_filter(&FilterExpr::Eq {
            field: FilterField::Seniority,
            value: "lead".into(),
        });
        assert_eq!(filter.must.len(), 1);
    }

    #[test]
    fn test_neighbor_from_payload() {
        let mut payload = HashMap::new();
        payload.insert(
            "job_id".to_string(),
            Value {
                kind: Some(Kind::IntegerValue(12)),
            },
        );
        payload.insert("title".to_string(), string_value("Data Engineer"));
        payload.insert("area".to_string(), string_value("dados"));
        payload.insert("document".to_string(), string_value("Cargo: Data Engineer"));

        let neighbor = to_neighbor(&payload, 0.8).unwrap();
        assert_eq!(neighbor.id, "job_12");
        assert_eq!(neighbor.metadata.job_id, 12);
        assert_eq!(neighbor.metadata.area, "dados");
        assert_eq!(neighbor.metadata.location, "");
        assert_eq!(neighbor.document.as_deref(), Some("Cargo: Data Engineer"));
        assert!((neighbor.distance - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_neighbor_without_job_id_is_skipped() {
        let mut payload = HashMap::new();
        payload.insert("title".to_string(), string_value("orphan"));
        assert!(to_neighbor(&payload, 0.5).is_none());
    }

    #[test]
    fn test_negative_job_id_cannot_be_point_id() {
        let entry = IndexEntry {
            id: "job_-1".into(),
            vector: vec![1.0],
            metadata: JobMetadata {
                job_id: -1,
                title: String::new(),
                company: String::new(),
                area: String::new(),
                seniority: String::new(),
                location: String::new(),
            },
            document: String::new(),
        };
        assert!(matches!(to_point(entry), Err(Error::Validation(_))));
    }
}
