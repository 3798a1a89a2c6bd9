//! Result types shared by all scorers.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::document::{Document, Metadata};

/// Which ranking produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Vector,
    Keyword,
    Both,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vector => write!(f, "vector"),
            Self::Keyword => write!(f, "keyword"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// A ranked piece of evidence returned to the caller.
///
/// Carries the document's text and metadata but never its vector.
/// `score` is always within `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    pub score: f32,
    pub provenance: Provenance,
}

impl SearchResult {
    pub(crate) fn new(document: &Document, score: f32, provenance: Provenance) -> Self {
        Self {
            id: document.id.clone(),
            text: document.text.clone(),
            metadata: document.metadata.clone(),
            score: score.clamp(0.0, 1.0),
            provenance,
        }
    }
}

/// A document paired with the raw score of a single scorer.
///
/// Raw scores are cosine similarities for the vector store and term counts
/// for the keyword index; they are only comparable within one list.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Arc<Document>,
    pub score: f32,
}

impl ScoredDocument {
    pub fn new(document: Arc<Document>, score: f32) -> Self {
        Self { document, score }
    }
}
