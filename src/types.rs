//! Value types produced by a classification call.
//!
//! These are created fresh per request and handed to the caller; nothing
//! here is cached or persisted. The serialized shape mirrors the response
//! body consumers already expect:
//!
//! ```json
//! { "category_and_scores": [ { "category": "red", "score": 0.9 } ] }
//! ```

use serde::{Deserialize, Serialize};

/// One labeled score.
///
/// Scores are usually in `[0, 1]`, but nothing enforces it: models may emit
/// pre- or post-softmax values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    #[serde(rename = "category")]
    label: String,
    score: f64,
}

impl CategoryScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn score(&self) -> f64 {
        self.score
    }
}

/// Ranked output of one classification call.
///
/// Entries are ordered by score, highest first, with ties in ascending
/// label-index order. Only [`rank`](crate::rank::rank) builds these, so the
/// ordering holds for every value a caller can observe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    #[serde(rename = "category_and_scores")]
    entries: Vec<CategoryScore>,
}

impl ClassificationResult {
    pub(crate) fn from_ranked(entries: Vec<CategoryScore>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CategoryScore] {
        &self.entries
    }

    /// Highest-scoring entry, if the vocabulary was non-empty.
    pub fn best(&self) -> Option<&CategoryScore> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(label, score)` pairs in rank order.
    pub fn pairs(&self) -> Vec<(&str, f64)> {
        self.entries.iter().map(|e| (e.label(), e.score())).collect()
    }
}
