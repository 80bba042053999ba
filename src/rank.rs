//! Turns a raw score vector into a ranked [`ClassificationResult`].
//!
//! Ordering rule: score descending, ties broken by ascending label index.
//! NaN sorts after every number so a misbehaving model can never make the
//! sort panic or reorder valid scores.

use crate::types::{CategoryScore, ClassificationResult};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RankError {
    #[error("score vector has {scores} entries but the vocabulary has {labels} labels")]
    ShapeMismatch { scores: usize, labels: usize },
}

/// How many ranked entries to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopK {
    /// Keep the first `n` entries (or fewer, if the vocabulary is smaller).
    First(usize),
    /// Keep the whole ranked vocabulary.
    All,
}

impl TopK {
    fn limit(self, len: usize) -> usize {
        match self {
            TopK::First(n) => n.min(len),
            TopK::All => len,
        }
    }
}

/// Pair scores with labels by index, sort, and truncate.
pub fn rank<S: AsRef<str>>(
    scores: &[f64],
    labels: &[S],
    top_k: TopK,
) -> Result<ClassificationResult, RankError> {
    if scores.len() != labels.len() {
        return Err(RankError::ShapeMismatch {
            scores: scores.len(),
            labels: labels.len(),
        });
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    // Stable sort keeps ascending index order among equal scores.
    order.sort_by(|&a, &b| descending(scores[a], scores[b]));

    let entries = order
        .into_iter()
        .take(top_k.limit(scores.len()))
        .map(|i| CategoryScore::new(labels[i].as_ref(), scores[i]))
        .collect();

    Ok(ClassificationResult::from_ranked(entries))
}

fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
