//! Deterministic embeddings for tests and offline runs

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use veritas_domain::{EmbeddingModel, ServiceError};

/// Default vector length for `MockEmbeddingModel`
pub const DEFAULT_MOCK_DIMENSION: usize = 64;

/// Bag-of-words feature hashing into a fixed-length, L2-normalized vector
///
/// Texts sharing words land close together under cosine similarity, which
/// is enough to make retrieval ranking testable without a model.
#[derive(Debug, Clone)]
pub struct MockEmbeddingModel {
    dimension: usize,
    unavailable: Arc<AtomicBool>,
}

impl MockEmbeddingModel {
    /// Create a model producing vectors of `dimension` floats
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every subsequent call fail as if the endpoint were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Synchronous embedding
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let bucket = (fnv1a(token.as_bytes()) % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl Default for MockEmbeddingModel {
    fn default() -> Self {
        Self::new(DEFAULT_MOCK_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingModel for MockEmbeddingModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ServiceError::Unavailable(
                "mock embedding endpoint down".to_string(),
            ));
        }
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf29ce484222325u64, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x100000001b3)
    })
}

/// Cosine similarity; 0.0 when either vector is zero or lengths differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deterministic_and_normalized() {
        let model = MockEmbeddingModel::default();
        let a = model.embed("Plastic bags banned").await.unwrap();
        let b = model.embed("plastic BAGS banned").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_MOCK_DIMENSION);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_words_rank_higher() {
        let model = MockEmbeddingModel::new(256);
        let claim = model.embed_sync("city banned plastic bags");
        let related = model.embed_sync("the city council banned plastic bags in stores");
        let unrelated = model.embed_sync("football results from the weekend");
        assert!(cosine_similarity(&claim, &related) > cosine_similarity(&claim, &unrelated));
    }

    #[tokio::test]
    async fn test_unavailable() {
        let model = MockEmbeddingModel::default();
        model.set_unavailable(true);
        assert!(matches!(
            model.embed("x").await,
            Err(ServiceError::Unavailable(_))
        ));
    }

    #[test]
    fn test_cosine_edge_cases() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
