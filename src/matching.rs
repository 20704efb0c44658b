//! Matching engine: profile in, ranked jobs out.
//!
//! ```text
//! profile ──compose (once)──▶ query text ──embed──▶ vector
//!                                                     │
//!                               filtered kNN ◀────────┘
//!                                     │
//!                   bulk join with the record store
//!                                     │
//!                 ranked jobs + profile summary + corpus size
//! ```
//!
//! The engine also owns the write side of the index: a job is upserted into
//! the vector index first and marked with its embedding id second, so a job
//! is never marked indexed without a vector.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::compose;
use crate::error::{Error, Result};
use crate::index::{self, IndexEntry, JobMetadata, SearchFilters, VectorIndex};
use crate::metrics;
use crate::model::{embedding_id_for, JobRecord, NewJob, ProfileDraft, ProfileRecord};
use crate::search::{Embedding, EmbeddingProvider};
use crate::store::{NewProfile, RecordStore};

/// Result count used when a request does not name one.
pub const DEFAULT_RECOMMENDATIONS: usize = 10;

/// Upper bound on the result count a request may ask for.
pub const MAX_RECOMMENDATIONS: usize = 50;

fn default_count() -> usize {
    DEFAULT_RECOMMENDATIONS
}

/// Raw recommendation request as received from a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub session_id: String,
    #[serde(default = "default_count")]
    pub desired_count: usize,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub seniority: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl RecommendRequest {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            desired_count: DEFAULT_RECOMMENDATIONS,
            area: None,
            seniority: None,
            location: None,
        }
    }

    pub fn with_count(mut self, desired_count: usize) -> Self {
        self.desired_count = desired_count;
        self
    }

    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }

    pub fn with_seniority(mut self, seniority: impl Into<String>) -> Self {
        self.seniority = Some(seniority.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Check the count against `1..=max_count` and parse the filters.
    pub fn validate(&self, max_count: usize) -> Result<SearchFilters> {
        if self.session_id.trim().is_empty() {
            return Err(Error::Validation("session id is required".into()));
        }
        if self.desired_count == 0 || self.desired_count > max_count {
            return Err(Error::Validation(format!(
                "desired count must be between 1 and {}, got {}",
                max_count, self.desired_count
            )));
        }
        SearchFilters::parse(
            self.area.as_deref(),
            self.seniority.as_deref(),
            self.location.as_deref(),
        )
    }
}

/// One ranked job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedJob {
    pub job: JobRecord,
    /// `1 - distance / 2`, rounded to 4 decimals.
    pub similarity_score: f64,
    /// 1-based position in the index result.
    pub rank: u32,
}

/// Response of [`MatchingEngine::recommend`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendations {
    pub session_id: String,
    pub profile_summary: String,
    pub recommendations: Vec<RecommendedJob>,
    /// Index cardinality when the request was served.
    pub total_jobs_searched: usize,
}

/// Orchestrates profiles, embeddings, the vector index and the record store.
#[derive(Clone)]
pub struct MatchingEngine {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn RecordStore>,
    max_results: usize,
}

impl MatchingEngine {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            provider,
            index,
            store,
            max_results: MAX_RECOMMENDATIONS,
        }
    }

    /// Override the largest result count a request may ask for.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Persist a profile with its query text composed once, under a fresh session id.
    pub async fn create_profile(&self, draft: ProfileDraft) -> Result<ProfileRecord> {
        let query_text = non_blank(compose::profile_query_text(&draft));
        let profile = self
            .store
            .insert_profile(NewProfile {
                session_id: Uuid::new_v4().to_string(),
                draft,
                query_text,
            })
            .await?;
        info!(
            session_id = %profile.session_id,
            skills = profile.skills.len(),
            has_query = profile.query_text().is_some(),
            "Profile created"
        );
        Ok(profile)
    }

    /// Recompose and store the query text of an existing profile.
    pub async fn refresh_profile_query(&self, session_id: &str) -> Result<ProfileRecord> {
        let profile = self.load_profile(session_id).await?;
        let query_text = non_blank(compose::profile_query_text(&profile.draft()));
        let updated = self
            .store
            .update_profile_query(session_id, query_text)
            .await?;
        debug!(session_id, "Profile query text refreshed");
        Ok(updated)
    }

    /// Validate a raw request, then serve it.
    pub async fn recommend_request(&self, request: &RecommendRequest) -> Result<Recommendations> {
        let filters = request.validate(self.max_results)?;
        self.recommend(&request.session_id, request.desired_count, &filters)
            .await
    }

    /// Nearest jobs to the stored query text of a profile.
    ///
    /// Ranks follow the index order. Hits whose job record is gone are
    /// dropped, logged and counted; the remaining ranks are left as-is.
    pub async fn recommend(
        &self,
        session_id: &str,
        desired_count: usize,
        filters: &SearchFilters,
    ) -> Result<Recommendations> {
        let profile = self.load_profile(session_id).await?;
        let query_text = profile.query_text().ok_or_else(|| {
            Error::InvalidState(format!(
                "profile '{}' has no query text, resubmit the resume",
                session_id
            ))
        })?;

        let vector = self.provider.embed(query_text).await?;
        let hits = index::search(self.index.as_ref(), &vector, desired_count, filters).await?;
        let ids: Vec<i64> = hits.iter().map(|hit| hit.job_id).collect();
        let mut jobs = self.store.get_jobs(&ids).await?;

        let mut recommendations = Vec::with_capacity(hits.len());
        for (position, hit) in hits.into_iter().enumerate() {
            match jobs.remove(&hit.job_id) {
                Some(job) => recommendations.push(RecommendedJob {
                    job,
                    similarity_score: hit.similarity,
                    rank: position as u32 + 1,
                }),
                None => {
                    warn!(
                        embedding_id = %hit.embedding_id,
                        job_id = hit.job_id,
                        "Index hit has no job record, skipping"
                    );
                    metrics::record_consistency_gap();
                }
            }
        }

        let total_jobs_searched = self.index.count().await?;
        metrics::record_recommendation(recommendations.len());
        info!(
            session_id,
            returned = recommendations.len(),
            total_jobs_searched,
            "Recommendations served"
        );

        Ok(Recommendations {
            session_id: profile.session_id.clone(),
            profile_summary: compose::profile_summary(&profile),
            recommendations,
            total_jobs_searched,
        })
    }

    /// Persist a new job, filling missing categories, then index it.
    pub async fn add_job(&self, job: NewJob) -> Result<JobRecord> {
        job.validate()?;
        let mut record = self.store.insert_job(job.classify()).await?;
        let embedding_id = self.upsert_job_embedding(&record).await?;
        record.embedding_id = Some(embedding_id);
        Ok(record)
    }

    /// Index one job and record its embedding id.
    pub async fn upsert_job_embedding(&self, job: &JobRecord) -> Result<String> {
        let mut ids = self
            .upsert_job_embeddings_batch(std::slice::from_ref(job))
            .await?;
        ids.pop()
            .ok_or_else(|| Error::Embedding("no embedding produced for job".into()))
    }

    /// Index many jobs with one embedding call and one upsert, then mark them.
    ///
    /// Returns the embedding ids in input order.
    pub async fn upsert_job_embeddings_batch(&self, jobs: &[JobRecord]) -> Result<Vec<String>> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }
        let documents: Vec<String> = jobs.iter().map(compose::job_text).collect();
        let vectors = self.embed_documents(&documents).await?;

        let entries: Vec<IndexEntry> = jobs
            .iter()
            .zip(vectors)
            .zip(documents)
            .map(|((job, vector), document)| IndexEntry {
                id: embedding_id_for(job.id),
                vector,
                metadata: JobMetadata::from_job(job),
                document,
            })
            .collect();
        let assignments: Vec<(i64, String)> = entries
            .iter()
            .map(|entry| (entry.metadata.job_id, entry.id.clone()))
            .collect();

        self.index.upsert(entries).await?;
        self.store.set_embedding_ids(&assignments).await?;
        metrics::record_jobs_indexed(assignments.len());
        debug!(jobs = assignments.len(), "Job embeddings upserted");

        Ok(assignments.into_iter().map(|(_, id)| id).collect())
    }

    async fn embed_documents(&self, documents: &[String]) -> Result<Vec<Embedding>> {
        let vectors = self.provider.embed_batch(documents).await?;
        if vectors.len() != documents.len() {
            return Err(Error::Embedding(format!(
                "provider returned {} embeddings for {} documents",
                vectors.len(),
                documents.len()
            )));
        }
        Ok(vectors)
    }

    async fn load_profile(&self, session_id: &str) -> Result<ProfileRecord> {
        self.store
            .get_profile(session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("profile session '{}'", session_id)))
    }
}

fn non_blank(text: String) -> Option<String> {
    Some(text).filter(|text| !text.trim().is_empty())
}
