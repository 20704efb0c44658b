//! Metric names and recording helpers.
//!
//! Everything goes through the `metrics` facade. The crate installs no
//! recorder; without one every call is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

pub const RECOMMENDATIONS_TOTAL: &str = "jobmatch_recommendations_total";
pub const RECOMMENDED_JOBS: &str = "jobmatch_recommended_jobs";
pub const CONSISTENCY_GAPS_TOTAL: &str = "jobmatch_consistency_gaps_total";
pub const FEEDBACK_TOTAL: &str = "jobmatch_feedback_total";
pub const JOBS_INDEXED_TOTAL: &str = "jobmatch_jobs_indexed_total";
pub const INDEXING_RETRIES_TOTAL: &str = "jobmatch_indexing_retries_total";

/// Register descriptions with the installed recorder.
pub fn describe() {
    describe_counter!(RECOMMENDATIONS_TOTAL, "Recommendation requests served");
    describe_histogram!(
        RECOMMENDED_JOBS,
        Unit::Count,
        "Jobs returned per recommendation request"
    );
    describe_counter!(
        CONSISTENCY_GAPS_TOTAL,
        "Index hits dropped because the job record is missing"
    );
    describe_counter!(FEEDBACK_TOTAL, "Relevance judgments recorded");
    describe_counter!(JOBS_INDEXED_TOTAL, "Jobs upserted into the vector index");
    describe_counter!(INDEXING_RETRIES_TOTAL, "Batch indexing attempts retried");
}

pub(crate) fn record_recommendation(returned: usize) {
    counter!(RECOMMENDATIONS_TOTAL).increment(1);
    histogram!(RECOMMENDED_JOBS).record(returned as f64);
}

pub(crate) fn record_consistency_gap() {
    counter!(CONSISTENCY_GAPS_TOTAL).increment(1);
}

pub(crate) fn record_feedback(relevant: bool) {
    let rating = if relevant { "relevant" } else { "irrelevant" };
    counter!(FEEDBACK_TOTAL, "rating" => rating).increment(1);
}

pub(crate) fn record_jobs_indexed(count: usize) {
    counter!(JOBS_INDEXED_TOTAL).increment(count as u64);
}

pub(crate) fn record_indexing_retry() {
    counter!(INDEXING_RETRIES_TOTAL).increment(1);
}
