//! Relevance feedback ledger and precision@K.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::index::round4;
use crate::metrics;
use crate::model::{FeedbackRecord, NewFeedback, Rating};
use crate::store::RecordStore;

/// Precision@K over a profile's feedback records.
///
/// Only records with a rank at or above `k` qualify. The denominator is the
/// number of qualifying records capped at `k`, so a user who judged three
/// of the top ten is scored over three. Zero `k` or no qualifying records
/// give exactly `0.0`.
pub fn precision_at_k(records: &[FeedbackRecord], k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let qualifying: Vec<&FeedbackRecord> = records
        .iter()
        .filter(|record| record.rank_position.map_or(false, |rank| rank as usize <= k))
        .collect();
    if qualifying.is_empty() {
        return 0.0;
    }
    let relevant = qualifying
        .iter()
        .filter(|record| record.rating.is_relevant())
        .count();
    let denominator = k.min(qualifying.len());
    round4((relevant as f64 / denominator as f64).min(1.0))
}

/// Precision@K with a display message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecisionReport {
    pub session_id: String,
    pub k: usize,
    pub precision_at_k: f64,
    pub message: String,
}

/// Append-only store of relevance judgments.
#[derive(Clone)]
pub struct FeedbackLedger {
    store: Arc<dyn RecordStore>,
}

impl FeedbackLedger {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Record a judgment for a job shown to a profile.
    ///
    /// The job id is not checked against the record store.
    pub async fn record(
        &self,
        session_id: &str,
        job_id: i64,
        rating: Rating,
        rank_position: Option<u32>,
        similarity_score: Option<f64>,
    ) -> Result<i64> {
        if rank_position == Some(0) {
            return Err(Error::Validation("rank position is 1-based".into()));
        }
        let profile = self
            .store
            .get_profile(session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("profile session '{}'", session_id)))?;

        let record = self
            .store
            .insert_feedback(NewFeedback {
                profile_id: profile.id,
                job_id,
                rating,
                rank_position,
                similarity_score,
            })
            .await?;
        metrics::record_feedback(rating.is_relevant());
        info!(
            session_id,
            job_id,
            rating = rating.value(),
            feedback_id = record.id,
            "Feedback recorded"
        );
        Ok(record.id)
    }

    /// Precision@K for a profile; unknown profiles score `0.0`.
    pub async fn precision_at_k(&self, session_id: &str, k: usize) -> Result<f64> {
        let Some(profile) = self.store.get_profile(session_id).await? else {
            debug!(session_id, "Precision requested for unknown profile");
            return Ok(0.0);
        };
        let records = self.store.feedback_for_profile(profile.id).await?;
        Ok(precision_at_k(&records, k))
    }

    pub async fn precision_report(&self, session_id: &str, k: usize) -> Result<PrecisionReport> {
        let precision = self.precision_at_k(session_id, k).await?;
        Ok(PrecisionReport {
            session_id: session_id.to_string(),
            k,
            precision_at_k: precision,
            message: format!("Precision@{} = {:.2}%", k, precision * 100.0),
        })
    }

    /// Acknowledgement shown to the user after a judgment.
    pub fn ack_message(rating: Rating) -> &'static str {
        match rating {
            Rating::Relevant => "Obrigado! Vaga marcada como relevante.",
            Rating::Irrelevant => "Entendido! Usaremos isso para melhorar suas recomendações.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProfileDraft;
    use crate::store::{MemoryStore, NewProfile};

    fn record(rating: Rating, rank: Option<u32>) -> FeedbackRecord {
        FeedbackRecord {
            id: 0,
            profile_id: 1,
            job_id: 1,
            rating,
            rank_position: rank,
            similarity_score: None,
            created_at_ms: 0,
        }
    }

    async fn ledger_with_profile(session_id: &str) -> (FeedbackLedger, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_profile(NewProfile {
                session_id: session_id.into(),
                draft: ProfileDraft::default(),
                query_text: Some("Habilidades: Rust".into()),
            })
            .await
            .unwrap();
        (FeedbackLedger::new(store.clone()), store)
    }

    #[test]
    fn test_precision_of_four_out_of_five() {
        let ratings = [
            Rating::Relevant,
            Rating::Relevant,
            Rating::Relevant,
            Rating::Irrelevant,
            Rating::Relevant,
        ];
        let records: Vec<FeedbackRecord> = ratings
            .iter()
            .enumerate()
            .map(|(i, rating)| record(*rating, Some(i as u32 + 1)))
            .collect();
        assert_eq!(precision_at_k(&records, 5), 0.8);
    }

    #[test]
    fn test_precision_without_signal_is_zero() {
        assert_eq!(precision_at_k(&[], 10), 0.0);
        assert_eq!(precision_at_k(&[record(Rating::Relevant, None)], 10), 0.0);
        assert_eq!(precision_at_k(&[record(Rating::Relevant, Some(1))], 0), 0.0);
    }

    #[test]
    fn test_denominator_is_judged_count_capped_at_k() {
        let records = vec![
            record(Rating::Relevant, Some(1)),
            record(Rating::Irrelevant, Some(2)),
            record(Rating::Relevant, Some(8)),
        ];
        assert_eq!(precision_at_k(&records, 10), 0.6667);
        assert_eq!(precision_at_k(&records, 2), 0.5);
        assert_eq!(precision_at_k(&records, 1), 1.0);
    }

    #[test]
    fn test_precision_never_exceeds_one() {
        let records = vec![
            record(Rating::Relevant, Some(1)),
            record(Rating::Relevant, Some(1)),
            record(Rating::Relevant, Some(2)),
        ];
        assert_eq!(precision_at_k(&records, 2), 1.0);
    }

    #[tokio::test]
    async fn test_record_unknown_session_persists_nothing() {
        let (ledger, store) = ledger_with_profile("known").await;
        let err = ledger
            .record("unknown", 1, Rating::Relevant, Some(1), Some(0.9))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(store.feedback_for_profile(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_accepts_dangling_job() {
        let (ledger, store) = ledger_with_profile("s").await;
        let id = ledger
            .record("s", 9999, Rating::Irrelevant, Some(3), None)
            .await
            .unwrap();
        assert_eq!(id, 1);
        let stored = store.feedback_for_profile(1).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].job_id, 9999);
        assert_eq!(stored[0].rank_position, Some(3));
    }

    #[tokio::test]
    async fn test_record_rejects_zero_rank() {
        let (ledger, _) = ledger_with_profile("s").await;
        assert!(matches!(
            ledger.record("s", 1, Rating::Relevant, Some(0), None).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_precision_through_ledger() {
        let (ledger, _) = ledger_with_profile("s").await;
        for (rank, rating) in [
            (1, Rating::Relevant),
            (2, Rating::Relevant),
            (3, Rating::Relevant),
            (4, Rating::Irrelevant),
            (5, Rating::Relevant),
        ] {
            ledger
                .record("s", rank as i64, rating, Some(rank), None)
                .await
                .unwrap();
        }
        assert_eq!(ledger.precision_at_k("s", 5).await.unwrap(), 0.8);
        assert_eq!(ledger.precision_at_k("nobody", 5).await.unwrap(), 0.0);

        let report = ledger.precision_report("s", 5).await.unwrap();
        assert_eq!(report.message, "Precision@5 = 80.00%");
    }

    #[test]
    fn test_ack_messages_differ_by_rating() {
        assert_ne!(
            FeedbackLedger::ack_message(Rating::Relevant),
            FeedbackLedger::ack_message(Rating::Irrelevant)
        );
    }
}
