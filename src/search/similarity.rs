//! Vector math and ordering helpers.

use crate::error::{Result, RetrievalError};

use super::types::ScoredDocument;

/// Cosine similarity of two vectors of equal length.
///
/// Returns 0.0 when either vector has zero norm. Vectors of different length
/// are a contract violation and are never truncated or padded.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(RetrievalError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    // Rounding can push parallel vectors slightly past 1
    Ok((dot_product / (magnitude_a * magnitude_b)).clamp(-1.0, 1.0))
}

/// Map a cosine similarity from `[-1, 1]` onto `[0, 1]`.
pub fn unit_score(cosine: f32) -> f32 {
    ((cosine + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Stable sort, highest score first; equal scores keep their current order.
pub(crate) fn sort_descending(scored: &mut [ScoredDocument]) {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
}
