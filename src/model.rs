//! Typed records shared by the store, the composer and the engine.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::taxonomy::{Area, Seniority};

/// Prefix of the deterministic vector-index id of a job.
pub const EMBEDDING_ID_PREFIX: &str = "job_";

/// Index key for a job primary key (`"job_" + id`).
pub fn embedding_id_for(job_id: i64) -> String {
    format!("{}{}", EMBEDDING_ID_PREFIX, job_id)
}

pub(crate) fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A job posting as held by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: i64,
    /// Source-system identifier used to skip re-ingested postings.
    #[serde(default)]
    pub external_id: Option<String>,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    pub description: String,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub seniority: Seniority,
    #[serde(default)]
    pub area: Area,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub salary_min: Option<f64>,
    #[serde(default)]
    pub salary_max: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
    /// Key of this job's vector in the index; `None` until indexed.
    #[serde(default)]
    pub embedding_id: Option<String>,
    #[serde(default)]
    pub created_at_ms: u64,
}

impl JobRecord {
    pub fn is_indexed(&self) -> bool {
        self.embedding_id.is_some()
    }
}

/// Job payload before the store has assigned a primary key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    #[serde(default)]
    pub external_id: Option<String>,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    pub description: String,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub seniority: Option<Seniority>,
    #[serde(default)]
    pub area: Option<Area>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub salary_min: Option<f64>,
    #[serde(default)]
    pub salary_max: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
}

impl NewJob {
    /// Reject postings without the fields every record must carry.
    pub fn validate(&self) -> Result<(), Error> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("job title is required".into()));
        }
        if self.company.trim().is_empty() {
            return Err(Error::Validation("job company is required".into()));
        }
        if self.description.trim().is_empty() {
            return Err(Error::Validation("job description is required".into()));
        }
        if let (Some(min), Some(max)) = (self.salary_min, self.salary_max) {
            if min > max {
                return Err(Error::Validation(format!(
                    "salary_min {} exceeds salary_max {}",
                    min, max
                )));
            }
        }
        Ok(())
    }

    /// Fill a missing area or seniority by keyword detection over title and description.
    pub fn classify(mut self) -> Self {
        if self.area.is_none() || self.seniority.is_none() {
            let text = format!("{} {}", self.title, self.description);
            self.area.get_or_insert_with(|| Area::detect(&text));
            self.seniority.get_or_insert_with(|| Seniority::detect(&text));
        }
        self
    }

    pub(crate) fn into_record(self, id: i64) -> JobRecord {
        JobRecord {
            id,
            external_id: self.external_id.filter(|ext| !ext.trim().is_empty()),
            title: self.title,
            company: self.company,
            location: self.location,
            description: self.description,
            requirements: self.requirements,
            seniority: self.seniority.unwrap_or_default(),
            area: self.area.unwrap_or_default(),
            skills: self.skills,
            salary_min: self.salary_min,
            salary_max: self.salary_max,
            url: self.url,
            embedding_id: None,
            created_at_ms: now_epoch_ms(),
        }
    }
}

/// One professional experience found in a resume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    pub period: String,
    pub snippet: String,
    #[serde(default)]
    pub nearby_organizations: Vec<String>,
}

/// One academic degree found in a resume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    pub degree: String,
    pub field: String,
}

/// Output of resume extraction: everything a profile needs except its identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileDraft {
    #[serde(default)]
    pub raw_text: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experiences: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub desired_area: Option<Area>,
    #[serde(default)]
    pub desired_seniority: Option<Seniority>,
}

/// A stored candidate profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: i64,
    /// Client-facing handle, generated once.
    pub session_id: String,
    #[serde(default)]
    pub raw_text: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experiences: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub desired_area: Option<Area>,
    #[serde(default)]
    pub desired_seniority: Option<Seniority>,
    /// Embedding input frozen at creation; only an explicit re-save replaces it.
    #[serde(default)]
    pub query_text: Option<String>,
    #[serde(default)]
    pub created_at_ms: u64,
}

impl ProfileRecord {
    /// The stored query text, if it is usable.
    pub fn query_text(&self) -> Option<&str> {
        self.query_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    /// The extraction fields of this profile, without identity.
    pub fn draft(&self) -> ProfileDraft {
        ProfileDraft {
            raw_text: self.raw_text.clone(),
            skills: self.skills.clone(),
            experiences: self.experiences.clone(),
            education: self.education.clone(),
            languages: self.languages.clone(),
            desired_area: self.desired_area,
            desired_seniority: self.desired_seniority,
        }
    }
}

/// A user's relevance judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Rating {
    Irrelevant,
    Relevant,
}

impl Rating {
    pub fn value(self) -> i8 {
        match self {
            Rating::Irrelevant => -1,
            Rating::Relevant => 1,
        }
    }

    pub fn is_relevant(self) -> bool {
        self == Rating::Relevant
    }
}

impl TryFrom<i8> for Rating {
    type Error = Error;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Rating::Irrelevant),
            1 => Ok(Rating::Relevant),
            other => Err(Error::Validation(format!(
                "rating must be -1 or 1, got {}",
                other
            ))),
        }
    }
}

impl From<Rating> for i8 {
    fn from(rating: Rating) -> Self {
        rating.value()
    }
}

/// Feedback payload before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFeedback {
    pub profile_id: i64,
    pub job_id: i64,
    pub rating: Rating,
    pub rank_position: Option<u32>,
    pub similarity_score: Option<f64>,
}

/// One entry in the append-only feedback ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: i64,
    pub profile_id: i64,
    pub job_id: i64,
    pub rating: Rating,
    /// 1-based position at which the job was shown.
    #[serde(default)]
    pub rank_position: Option<u32>,
    /// Similarity displayed to the user when judging.
    #[serde(default)]
    pub similarity_score: Option<f64>,
    #[serde(default)]
    pub created_at_ms: u64,
}
