//! Embedding providers for profile and job texts.
//!
//! The matching engine depends only on the [`EmbeddingProvider`] trait, so
//! the model can be swapped or stubbed without touching process-wide state.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌─────────────────────┐
//! │ composed text    │────▶│ EmbeddingProvider   │
//! │ (job / profile)  │     │  - EmbeddingService │  FastEmbed (ONNX) + moka cache
//! └──────────────────┘     │  - HashingEmbedder  │  offline, deterministic
//!                          └──────────┬──────────┘
//!                                     │
//!                                     ▼
//!                              ┌──────────────┐
//!                              │ unit vector  │
//!                              │   Vec<f32>   │
//!                              └──────────────┘
//! ```

mod embedding;
mod hashing;

use async_trait::async_trait;

use crate::error::Result;

pub use embedding::{EmbeddingService, EmbeddingServiceConfig};
pub use hashing::HashingEmbedder;

/// Default embedding model (multilingual, 768 dimensions).
pub const DEFAULT_MODEL: &str = "paraphrase-multilingual-mpnet-base-v2";

/// Embedding dimension for the default model.
pub const EMBEDDING_DIM: usize = 768;

/// A dense text embedding.
pub type Embedding = Vec<f32>;

/// Maps text to fixed-length unit vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed many texts; output order and length match the input.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Scale `vector` to unit length in place. Zero vectors are left untouched.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity between two vectors; 0.0 for mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_produces_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_leaves_zero_vector() {
        let mut v = vec![0.0, 0.0, 0.0];
        normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_cosine_similarity_bounds() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
