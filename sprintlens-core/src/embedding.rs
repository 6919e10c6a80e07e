//! Embedding vector operations

use crate::{LensError, LensResult, VectorError};
use serde::{Deserialize, Serialize};

/// Default epsilon added to the cosine denominator.
pub const DEFAULT_SIMILARITY_EPSILON: f64 = 1e-10;

/// Embedding vector with dynamic dimensions.
/// Supports any embedding model dimension (e.g., 384, 768, 1536, 3072).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector {
    /// The embedding data as a vector of f32 values.
    pub data: Vec<f32>,
    /// Identifier of the model that produced this embedding.
    pub model_id: String,
    /// Number of dimensions (must match data.len()).
    pub dimensions: i32,
}

impl EmbeddingVector {
    /// Create a new embedding vector.
    pub fn new(data: Vec<f32>, model_id: String) -> Self {
        let dimensions = data.len() as i32;
        Self {
            data,
            model_id,
            dimensions,
        }
    }

    /// Euclidean norm, accumulated in f64.
    pub fn norm(&self) -> f64 {
        self.data
            .iter()
            .map(|x| f64::from(*x) * f64::from(*x))
            .sum::<f64>()
            .sqrt()
    }

    /// Compute cosine similarity between two embedding vectors.
    ///
    /// `sim(a, b) = dot(a, b) / (|a| * |b| + epsilon)`. The epsilon only guards
    /// against division by zero, so a zero vector scores 0 against anything
    /// and near-zero vectors score slightly low.
    pub fn cosine_similarity(&self, other: &EmbeddingVector, epsilon: f64) -> LensResult<f64> {
        if self.dimensions != other.dimensions || self.data.len() != other.data.len() {
            return Err(LensError::Vector(VectorError::DimensionMismatch {
                expected: self.dimensions,
                got: other.dimensions,
            }));
        }

        let mut dot_product = 0.0f64;
        let mut norm_a = 0.0f64;
        let mut norm_b = 0.0f64;

        for (a, b) in self.data.iter().zip(other.data.iter()) {
            let (a, b) = (f64::from(*a), f64::from(*b));
            dot_product += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        Ok(dot_product / (norm_a.sqrt() * norm_b.sqrt() + epsilon))
    }

    /// Check if this vector has valid dimensions.
    pub fn is_valid(&self) -> bool {
        self.dimensions > 0 && self.data.len() == self.dimensions as usize
    }
}

// =============================================================================
// TESTS
// =============================================================================
