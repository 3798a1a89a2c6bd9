//! Maximal marginal relevance selection.

use crate::error::{check_unit_interval, Result};

use super::similarity::cosine_similarity;
use super::types::ScoredDocument;

/// Select up to `k` documents from `pool` balancing relevance and novelty.
///
/// Each round picks the candidate maximizing
/// `lambda * relevance - (1 - lambda) * redundancy`, where relevance is the
/// candidate's pool score and redundancy is its highest cosine similarity to
/// anything already selected (0 before the first pick). Ties go to the
/// candidate that appears earlier in the pool. Returned documents keep their
/// relevance as score, in selection order.
pub fn select(pool: Vec<ScoredDocument>, k: usize, lambda: f32) -> Result<Vec<ScoredDocument>> {
    check_unit_interval("lambda", lambda)?;

    let mut remaining: Vec<(ScoredDocument, f32)> = pool
        .into_iter()
        .map(|candidate| (candidate, f32::NEG_INFINITY))
        .collect();
    let mut selected: Vec<ScoredDocument> = Vec::with_capacity(k.min(remaining.len()));

    while selected.len() < k && !remaining.is_empty() {
        let mut best_index = 0;
        let mut best_score = f32::NEG_INFINITY;

        for (index, (candidate, redundancy)) in remaining.iter().enumerate() {
            let redundancy = if selected.is_empty() { 0.0 } else { *redundancy };
            let score = lambda * candidate.score - (1.0 - lambda) * redundancy;
            if index == 0 || score > best_score {
                best_index = index;
                best_score = score;
            }
        }

        let (chosen, _) = remaining.remove(best_index);

        // Running max of similarity to the selected set
        for (candidate, redundancy) in remaining.iter_mut() {
            let similarity =
                cosine_similarity(&candidate.document.vector, &chosen.document.vector)?;
            *redundancy = redundancy.max(similarity);
        }

        selected.push(chosen);
    }

    Ok(selected)
}
