//! In-process record store with JSON snapshots.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{write_atomically, JobQuery, NewProfile, RecordStore};
use crate::error::{Error, Result};
use crate::model::{
    now_epoch_ms, FeedbackRecord, JobRecord, NewFeedback, NewJob, ProfileRecord,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    jobs: BTreeMap<i64, JobRecord>,
    profiles: BTreeMap<i64, ProfileRecord>,
    feedback: Vec<FeedbackRecord>,
    last_job_id: i64,
    last_profile_id: i64,
    last_feedback_id: i64,
}

impl StoreState {
    fn profile_id_by_session(&self, session_id: &str) -> Option<i64> {
        self.profiles
            .values()
            .find(|profile| profile.session_id == session_id)
            .map(|profile| profile.id)
    }
}

/// Record store kept in memory, optionally persisted as one JSON document.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot written by [`MemoryStore::save`]; a missing file yields an empty store.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            debug!(path = %path.display(), "No store snapshot, starting empty");
            return Ok(Self::new());
        }
        let raw = tokio::fs::read(path).await?;
        let state: StoreState = serde_json::from_slice(&raw)?;
        info!(
            path = %path.display(),
            jobs = state.jobs.len(),
            profiles = state.profiles.len(),
            feedback = state.feedback.len(),
            "Loaded store snapshot"
        );
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = serde_json::to_vec(&*self.state.read().await)?;
        write_atomically(path.as_ref(), &raw).await
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_job(&self, job: NewJob) -> Result<JobRecord> {
        let mut state = self.state.write().await;
        if let Some(external_id) = job.external_id.as_deref().filter(|e| !e.trim().is_empty()) {
            let taken = state
                .jobs
                .values()
                .any(|existing| existing.external_id.as_deref() == Some(external_id));
            if taken {
                return Err(Error::Validation(format!(
                    "external id '{}' already exists",
                    external_id
                )));
            }
        }
        state.last_job_id += 1;
        let record = job.into_record(state.last_job_id);
        state.jobs.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_job(&self, id: i64) -> Result<Option<JobRecord>> {
        Ok(self.state.read().await.jobs.get(&id).cloned())
    }

    async fn get_jobs(&self, ids: &[i64]) -> Result<HashMap<i64, JobRecord>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.jobs.get(id).map(|job| (*id, job.clone())))
            .collect())
    }

    async fn find_job_by_external_id(&self, external_id: &str) -> Result<Option<JobRecord>> {
        let state = self.state.read().await;
        Ok(state
            .jobs
            .values()
            .find(|job| job.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<JobRecord>> {
        let state = self.state.read().await;
        Ok(state
            .jobs
            .values()
            .filter(|job| query.matches(job))
            .skip(query.skip)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn count_jobs(&self) -> Result<usize> {
        Ok(self.state.read().await.jobs.len())
    }

    async fn unindexed_jobs(&self) -> Result<Vec<JobRecord>> {
        let state = self.state.read().await;
        Ok(state
            .jobs
            .values()
            .filter(|job| !job.is_indexed())
            .cloned()
            .collect())
    }

    async fn set_embedding_ids(&self, assignments: &[(i64, String)]) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some((missing, _)) = assignments
            .iter()
            .find(|(id, _)| !state.jobs.contains_key(id))
        {
            return Err(Error::NotFound(format!("job {}", missing)));
        }
        for (id, embedding_id) in assignments {
            if let Some(job) = state.jobs.get_mut(id) {
                job.embedding_id = Some(embedding_id.clone());
            }
        }
        Ok(())
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<ProfileRecord> {
        let mut state = self.state.write().await;
        if state.profile_id_by_session(&profile.session_id).is_some() {
            return Err(Error::Validation(format!(
                "session '{}' already exists",
                profile.session_id
            )));
        }
        state.last_profile_id += 1;
        let draft = profile.draft;
        let record = ProfileRecord {
            id: state.last_profile_id,
            session_id: profile.session_id,
            raw_text: draft.raw_text,
            skills: draft.skills,
            experiences: draft.experiences,
            education: draft.education,
            languages: draft.languages,
            desired_area: draft.desired_area,
            desired_seniority: draft.desired_seniority,
            query_text: profile.query_text,
            created_at_ms: now_epoch_ms(),
        };
        state.profiles.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_profile(&self, session_id: &str) -> Result<Option<ProfileRecord>> {
        let state = self.state.read().await;
        Ok(state
            .profile_id_by_session(session_id)
            .and_then(|id| state.profiles.get(&id))
            .cloned())
    }

    async fn update_profile_query(
        &self,
        session_id: &str,
        query_text: Option<String>,
    ) -> Result<ProfileRecord> {
        let mut state = self.state.write().await;
        let id = state
            .profile_id_by_session(session_id)
            .ok_or_else(|| Error::NotFound(format!("profile session '{}'", session_id)))?;
        let profile = state
            .profiles
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("profile {}", id)))?;
        profile.query_text = query_text;
        Ok(profile.clone())
    }

    async fn insert_feedback(&self, feedback: NewFeedback) -> Result<FeedbackRecord> {
        let mut state = self.state.write().await;
        if !state.profiles.contains_key(&feedback.profile_id) {
            return Err(Error::NotFound(format!("profile {}", feedback.profile_id)));
        }
        state.last_feedback_id += 1;
        let record = FeedbackRecord {
            id: state.last_feedback_id,
            profile_id: feedback.profile_id,
            job_id: feedback.job_id,
            rating: feedback.rating,
            rank_position: feedback.rank_position,
            similarity_score: feedback.similarity_score,
            created_at_ms: now_epoch_ms(),
        };
        state.feedback.push(record.clone());
        Ok(record)
    }

    async fn feedback_for_profile(&self, profile_id: i64) -> Result<Vec<FeedbackRecord>> {
        let state = self.state.read().await;
        Ok(state
            .feedback
            .iter()
            .filter(|record| record.profile_id == profile_id)
            .cloned()
            .collect())
    }
}
