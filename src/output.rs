//! CLI output formatting.
//!
//! # Classification
//!
//! One line per ranked entry: 1-based rank, score as a percentage, label.
//!
//! ```text
//! 001  90.00%  red
//! 002  10.00%  blue
//! ```
//!
//! `--json` prints the response body instead:
//!
//! ```text
//! {"category_and_scores":[{"category":"red","score":0.9},{"category":"blue","score":0.1}]}
//! ```
//!
//! # Startup report
//!
//! ```text
//! Backend: nin
//!     Input: 224x224x3, mean 114.5, scale 57.6
//!     Top-K: 5
//!     Vocabulary: 1000 labels
//!     Fingerprint: 3f1c…
//! ```
//!
//! Each `format_*` function returns `Vec<String>` for testability; the
//! `print_*` wrappers write to stdout. Format functions do no I/O.

use crate::backend::ClassifierBackend;
use crate::rank::TopK;
use crate::types::ClassificationResult;

fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn format_percent(score: f64) -> String {
    format!("{:>7.2}%", score * 100.0)
}

fn format_top_k(top_k: TopK) -> String {
    match top_k {
        TopK::First(n) => n.to_string(),
        TopK::All => "all".to_string(),
    }
}

// ============================================================================
// Classification
// ============================================================================

pub fn format_classification(result: &ClassificationResult) -> Vec<String> {
    if result.is_empty() {
        return vec!["(no categories)".to_string()];
    }
    result
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!(
                "{} {}  {}",
                format_index(i + 1),
                format_percent(entry.score()),
                entry.label()
            )
        })
        .collect()
}

pub fn format_classification_json(result: &ClassificationResult) -> Result<String, serde_json::Error> {
    serde_json::to_string(result)
}

pub fn print_classification(result: &ClassificationResult) {
    for line in format_classification(result) {
        println!("{}", line);
    }
}

// ============================================================================
// Startup report
// ============================================================================

pub fn format_startup_report(backend: &dyn ClassifierBackend) -> Vec<String> {
    let pipeline = backend.pipeline();
    let params = pipeline.params();
    let engine = backend.engine();

    let mut lines = vec![format!("Backend: {}", backend.kind())];
    lines.push(format!(
        "{}Input: {}x{}x{}, mean {}, scale {}",
        indent(1),
        params.target_width,
        params.target_height,
        params.channels.count(),
        params.mean,
        params.scale
    ));
    lines.push(format!("{}Top-K: {}", indent(1), format_top_k(pipeline.top_k())));
    lines.push(format!(
        "{}Vocabulary: {} labels",
        indent(1),
        engine.vocabulary().len()
    ));
    if let Some(fingerprint) = engine.fingerprint() {
        lines.push(format!("{}Fingerprint: {}", indent(1), fingerprint));
    }
    lines
}

pub fn print_startup_report(backend: &dyn ClassifierBackend) {
    for line in format_startup_report(backend) {
        println!("{}", line);
    }
}
