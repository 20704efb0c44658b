//! Record store collaborator.
//!
//! Holds the canonical job, profile and feedback records. The vector index
//! only mirrors jobs; everything a response shows is joined back from here.

mod memory;

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{FeedbackRecord, JobRecord, NewFeedback, NewJob, ProfileDraft, ProfileRecord};
use crate::taxonomy::{Area, Seniority};

pub use memory::MemoryStore;

/// Default page size of [`RecordStore::list_jobs`].
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Listing criteria for jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobQuery {
    pub area: Option<Area>,
    pub seniority: Option<Seniority>,
    pub skip: usize,
    pub limit: usize,
}

impl Default for JobQuery {
    fn default() -> Self {
        Self {
            area: None,
            seniority: None,
            skip: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl JobQuery {
    pub fn matches(&self, job: &JobRecord) -> bool {
        self.area.map_or(true, |area| job.area == area)
            && self.seniority.map_or(true, |level| job.seniority == level)
    }
}

/// Profile payload before the store has assigned a primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProfile {
    pub session_id: String,
    pub draft: ProfileDraft,
    pub query_text: Option<String>,
}

/// Persistence for jobs, profiles and feedback.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a job and assign its id. Fails on a duplicate external id.
    async fn insert_job(&self, job: NewJob) -> Result<JobRecord>;

    async fn get_job(&self, id: i64) -> Result<Option<JobRecord>>;

    /// Bulk lookup; ids without a record are absent from the map.
    async fn get_jobs(&self, ids: &[i64]) -> Result<HashMap<i64, JobRecord>>;

    async fn find_job_by_external_id(&self, external_id: &str) -> Result<Option<JobRecord>>;

    /// Jobs matching `query`, ordered by id.
    async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<JobRecord>>;

    async fn count_jobs(&self) -> Result<usize>;

    /// Jobs without an embedding id, ordered by id.
    async fn unindexed_jobs(&self) -> Result<Vec<JobRecord>>;

    /// Record the index key of each job. All ids must exist; nothing is
    /// written otherwise.
    async fn set_embedding_ids(&self, assignments: &[(i64, String)]) -> Result<()>;

    async fn insert_profile(&self, profile: NewProfile) -> Result<ProfileRecord>;

    async fn get_profile(&self, session_id: &str) -> Result<Option<ProfileRecord>>;

    /// Replace the stored query text of a profile.
    async fn update_profile_query(
        &self,
        session_id: &str,
        query_text: Option<String>,
    ) -> Result<ProfileRecord>;

    /// Append a feedback record.
    async fn insert_feedback(&self, feedback: NewFeedback) -> Result<FeedbackRecord>;

    /// Every feedback record of a profile, oldest first.
    async fn feedback_for_profile(&self, profile_id: i64) -> Result<Vec<FeedbackRecord>>;
}

/// Write `bytes` to a sibling temp file, then rename it over `path`.
pub(crate) async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
