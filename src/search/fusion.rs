//! Weighted score fusion of a vector ranking and a keyword ranking.
//!
//! Each list is min-max normalized on its own, then documents are merged by
//! id and scored with `vector_weight * v + (1 - vector_weight) * k`, a missing
//! side contributing 0.

use std::collections::HashMap;
use std::sync::Arc;

use super::types::{Provenance, ScoredDocument, SearchResult};
use crate::document::Document;
use crate::error::{check_unit_interval, Result};

/// Rescale `scores` linearly into `[0, 1]`.
///
/// A list whose scores are all exactly equal (including a single score) maps
/// to 1.0 throughout, so a lone hit is not discarded as the minimum. Any
/// nonzero spread, however small, is stretched to the full range.
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    let (min, max) = scores
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| {
            (lo.min(s), hi.max(s))
        });

    let range = max - min;
    if range.is_nan() || range <= 0.0 {
        return vec![1.0; scores.len()];
    }

    scores.iter().map(|s| (s - min) / range).collect()
}

struct Candidate {
    document: Arc<Document>,
    vector: Option<(usize, f32)>,
    keyword: Option<(usize, f32)>,
}

impl Candidate {
    fn rank(side: Option<(usize, f32)>) -> usize {
        side.map(|(rank, _)| rank).unwrap_or(usize::MAX)
    }

    fn score(side: Option<(usize, f32)>) -> f32 {
        side.map(|(_, score)| score).unwrap_or(0.0)
    }

    fn provenance(&self) -> Provenance {
        match (self.vector.is_some(), self.keyword.is_some()) {
            (true, true) => Provenance::Both,
            (true, false) => Provenance::Vector,
            _ => Provenance::Keyword,
        }
    }
}

/// Position of `scored` in `candidates`, appending it on first sight
fn slot<'a>(
    by_id: &mut HashMap<&'a str, usize>,
    candidates: &mut Vec<Candidate>,
    scored: &'a ScoredDocument,
) -> usize {
    *by_id.entry(scored.document.id.as_str()).or_insert_with(|| {
        candidates.push(Candidate {
            document: scored.document.clone(),
            vector: None,
            keyword: None,
        });
        candidates.len() - 1
    })
}

/// Linear combination of normalized vector and keyword scores.
#[derive(Debug, Clone, Copy)]
pub struct WeightedFusion {
    vector_weight: f32,
}

impl WeightedFusion {
    /// Fails with `InvalidParameter` unless `vector_weight` is within `[0, 1]`.
    pub fn new(vector_weight: f32) -> Result<Self> {
        check_unit_interval("vector_weight", vector_weight)?;
        Ok(Self { vector_weight })
    }

    pub fn vector_weight(&self) -> f32 {
        self.vector_weight
    }

    /// Merge two best-first lists into at most `limit` results.
    ///
    /// Equal combined scores are ordered by rank in the list carrying the
    /// larger weight (vector when the weights are equal), then by rank in the
    /// other list. With a weight of 1.0 the output is therefore the vector
    /// ranking, and with 0.0 the keyword ranking.
    pub fn fuse(
        &self,
        vector: &[ScoredDocument],
        keyword: &[ScoredDocument],
        limit: usize,
    ) -> Vec<SearchResult> {
        let vector_norm = min_max_normalize(&vector.iter().map(|s| s.score).collect::<Vec<_>>());
        let keyword_norm =
            min_max_normalize(&keyword.iter().map(|s| s.score).collect::<Vec<_>>());

        let mut by_id: HashMap<&str, usize> = HashMap::new();
        let mut candidates: Vec<Candidate> = Vec::with_capacity(vector.len() + keyword.len());

        for (rank, (scored, norm)) in vector.iter().zip(vector_norm).enumerate() {
            let index = slot(&mut by_id, &mut candidates, scored);
            candidates[index].vector.get_or_insert((rank, norm));
        }
        for (rank, (scored, norm)) in keyword.iter().zip(keyword_norm).enumerate() {
            let index = slot(&mut by_id, &mut candidates, scored);
            candidates[index].keyword.get_or_insert((rank, norm));
        }

        let w = self.vector_weight;
        let vector_leads = w >= 0.5;
        let mut combined: Vec<(f32, &Candidate)> = candidates
            .iter()
            .map(|c| {
                let score =
                    w * Candidate::score(c.vector) + (1.0 - w) * Candidate::score(c.keyword);
                (score, c)
            })
            .collect();

        combined.sort_by(|(sa, a), (sb, b)| {
            let (lead_a, lead_b, other_a, other_b) = if vector_leads {
                (a.vector, b.vector, a.keyword, b.keyword)
            } else {
                (a.keyword, b.keyword, a.vector, b.vector)
            };
            sb.total_cmp(sa)
                .then_with(|| Candidate::rank(lead_a).cmp(&Candidate::rank(lead_b)))
                .then_with(|| Candidate::rank(other_a).cmp(&Candidate::rank(other_b)))
        });

        combined
            .into_iter()
            .take(limit)
            .map(|(score, c)| SearchResult::new(&c.document, score, c.provenance()))
            .collect()
    }
}
