//! # Image Classifier
//!
//! Classify the image behind a URL with a pre-trained model and get back
//! labels ranked by score.
//!
//! # Architecture: Four-Stage Pipeline
//!
//! Every request runs the same stages, in order, on the calling thread:
//!
//! ```text
//! 1. Fetch       URL     →  bytes          (http, https, file)
//! 2. Preprocess  bytes   →  [1, H, W, C]   (decode, resize, normalize)
//! 3. Infer       tensor  →  [1, N] scores  (loaded model)
//! 4. Rank        scores  →  ranked labels  (sort, top-K)
//! ```
//!
//! Each stage fails fast with its own error type; the caller sees which
//! stage failed and never gets a partial result.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`backend`] | Backend variants, the shared pipeline, and startup selection |
//! | [`fetch`] | Stage 1: URL validation and retrieval |
//! | [`preprocess`] | Stage 2: image decode and tensor normalization |
//! | [`inference`] | Stage 3: model loading, label vocabulary, output shape checks |
//! | [`rank`] | Stage 4: score/label pairing, ordering, truncation |
//! | [`config`] | `classifier.toml` loading, merging over stock defaults, validation |
//! | [`types`] | Result types returned to callers |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Load Once, Share Read-Only
//!
//! The model and its labels are loaded in a single initialization phase
//! ([`backend::select_backend`]). A failure there is fatal. Afterwards the
//! engine is immutable and shared behind an `Arc`, so concurrent requests
//! need no locks.
//!
//! ## Variants Are Constants, Not Config
//!
//! Preprocessing parameters are tied to how a model was trained. Each
//! backend variant compiles them in; configuration only chooses the variant
//! and points at its files.
//!
//! ## Pure-Rust Inference
//!
//! Models run on `tract`, which reads both ONNX and TensorFlow graphs with no
//! native runtime to install.

pub mod backend;
pub mod config;
pub mod fetch;
pub mod inference;
pub mod output;
pub mod preprocess;
pub mod rank;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
