//! jobmatch: semantic job recommendation.
//!
//! Matches a parsed candidate profile against a corpus of job postings by
//! dense-embedding similarity, applies structured filters, ranks the
//! results, and measures recommendation quality with precision@K computed
//! from recorded relevance feedback.
//!
//! # Modules
//!
//! - [`compose`]: record to embedding-input text
//! - [`search`]: embedding providers (FastEmbed, feature hashing)
//! - [`index`]: vector index adapters (in-process, Qdrant) and filters
//! - [`matching`]: the recommendation engine
//! - [`feedback`]: relevance ledger and precision@K
//! - [`indexing`]: background batch indexing with retries
//! - [`ingest`]: JSON Lines job ingestion
//! - [`store`]: record store

pub mod compose;
pub mod config;
pub mod context;
pub mod error;
pub mod feedback;
pub mod index;
pub mod indexing;
pub mod ingest;
pub mod matching;
pub mod metrics;
pub mod model;
pub mod search;
pub mod store;
pub mod taxonomy;

pub use config::{AppConfig, EmbeddingBackend, IndexBackend};
pub use context::AppContext;
pub use error::{Error, Result};
pub use feedback::{FeedbackLedger, PrecisionReport};
pub use index::{
    FilterExpr, FilterField, MemoryIndex, QdrantIndex, QdrantIndexConfig, SearchFilters,
    VectorIndex,
};
pub use indexing::{BatchIndexer, IndexingConfig, IndexingReport};
pub use ingest::IngestReport;
pub use matching::{MatchingEngine, RecommendRequest, RecommendedJob, Recommendations};
pub use model::{
    Education, Experience, FeedbackRecord, JobRecord, NewJob, ProfileDraft, ProfileRecord, Rating,
};
pub use search::{
    EmbeddingProvider, EmbeddingService, EmbeddingServiceConfig, HashingEmbedder,
};
pub use store::{JobQuery, MemoryStore, RecordStore};
pub use taxonomy::{Area, Seniority};
