//! Euclidean-distance matching of face embeddings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decision threshold on Euclidean distance: distances strictly below this
/// value count as the same person. Lower distance = more similar.
pub const MATCH_THRESHOLD: f32 = 0.6;

#[derive(Error, Debug)]
pub enum MatchError {
    /// Probe and template have different dimensionality. This is a
    /// model/enrollment mismatch, never a low-confidence match, and aborts
    /// the comparison.
    #[error("embedding dimension mismatch: probe has {probe} values, template has {template}")]
    DimensionMismatch { probe: usize, template: usize },
}

/// Face embedding vector, produced by an external descriptor model
/// (128-dimensional for the model in use).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Euclidean distance to another embedding of the same dimensionality.
    pub fn distance(&self, other: &Embedding) -> Result<f32, MatchError> {
        if self.dim() != other.dim() {
            return Err(MatchError::DimensionMismatch {
                probe: self.dim(),
                template: other.dim(),
            });
        }
        Ok(self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt())
    }
}

/// Outcome of comparing a live probe against a stored template.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MatchOutcome {
    /// Euclidean distance between probe and template.
    pub distance: f32,
    /// Whether the distance fell below the decision threshold.
    pub is_match: bool,
    /// Confidence percent: 100 at distance 0, 0 at distance >= 1.0.
    pub score: u8,
}

/// Fixed-threshold Euclidean matcher.
#[derive(Debug, Clone, Copy)]
pub struct BiometricMatcher {
    threshold: f32,
}

impl Default for BiometricMatcher {
    fn default() -> Self {
        Self::new(MATCH_THRESHOLD)
    }
}

impl BiometricMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Compare a live probe against a stored template.
    pub fn compare(
        &self,
        probe: &Embedding,
        template: &Embedding,
    ) -> Result<MatchOutcome, MatchError> {
        let distance = probe.distance(template)?;
        let score = (100.0 - distance * 100.0).clamp(0.0, 100.0).round() as u8;
        Ok(MatchOutcome {
            distance,
            is_match: distance < self.threshold,
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec())
    }

    #[test]
    fn identical_embeddings_match_with_full_score() {
        let e = emb(&[0.1, 0.2, 0.3]);
        let outcome = BiometricMatcher::default().compare(&e, &e).unwrap();
        assert_eq!(outcome.distance, 0.0);
        assert!(outcome.is_match);
        assert_eq!(outcome.score, 100);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = emb(&[0.9, -0.4, 0.2]);
        let b = emb(&[-0.1, 0.3, 0.7]);
        assert_eq!(a.distance(&b).unwrap(), b.distance(&a).unwrap());
    }

    #[test]
    fn close_probe_matches_with_proportional_score() {
        // 3-4-5 triangle scaled to distance 0.5
        let a = emb(&[0.0, 0.0]);
        let b = emb(&[0.3, 0.4]);
        let outcome = BiometricMatcher::default().compare(&a, &b).unwrap();
        assert!((outcome.distance - 0.5).abs() < 1e-6);
        assert!(outcome.is_match);
        assert_eq!(outcome.score, 50);
    }

    #[test]
    fn distant_probe_is_rejected() {
        let a = emb(&[0.0, 0.0, 0.0]);
        let b = emb(&[0.8, 0.0, 0.0]);
        let outcome = BiometricMatcher::default().compare(&a, &b).unwrap();
        assert!(!outcome.is_match);
        assert_eq!(outcome.score, 20);
    }

    #[test]
    fn decision_flips_around_the_threshold() {
        let matcher = BiometricMatcher::default();
        let origin = emb(&[0.0]);
        assert!(matcher.compare(&origin, &emb(&[0.59])).unwrap().is_match);
        assert!(!matcher.compare(&origin, &emb(&[0.61])).unwrap().is_match);
    }

    #[test]
    fn score_clamps_to_zero_beyond_unit_distance() {
        let a = emb(&[0.0, 0.0]);
        let b = emb(&[3.0, 4.0]);
        let outcome = BiometricMatcher::default().compare(&a, &b).unwrap();
        assert_eq!(outcome.score, 0);
        assert!(!outcome.is_match);
    }

    #[test]
    fn dimension_mismatch_is_fatal() {
        let a = emb(&[0.1, 0.2]);
        let b = emb(&[0.1, 0.2, 0.3]);
        let err = BiometricMatcher::default().compare(&a, &b).unwrap_err();
        assert!(matches!(
            err,
            MatchError::DimensionMismatch { probe: 2, template: 3 }
        ));
    }
}
