//! Classifier backends: URL in, ranked categories out.
//!
//! Every backend runs the same four stages through a shared [`Pipeline`]:
//!
//! ```text
//! fetch (URL → bytes) → preprocess (bytes → tensor) → infer (tensor → scores) → rank
//! ```
//!
//! Variants differ only in their compiled-in preprocessing constants, their
//! model artifact, and how many ranked entries they return:
//!
//! | Variant | Input | mean / scale | Top-K |
//! |---|---|---|---|
//! | [`InceptionBackend`] | 224×224 RGB | 117 / 1 | all |
//! | [`NinBackend`] | 224×224 RGB | 114.5 / 57.6 | 5 |
//!
//! The variant is picked once at startup by [`select_backend`]; call sites
//! only see `dyn ClassifierBackend`.

mod pipeline;
mod variants;

pub use pipeline::Pipeline;
pub use variants::{InceptionBackend, NinBackend};

use crate::config::{BackendKind, ClassifierConfig};
use crate::fetch::{FetchError, ImageFetcher};
use crate::inference::{InferenceEngine, InferenceError, ModelLoadError};
use crate::preprocess::PreprocessError;
use crate::rank::RankError;
use crate::types::ClassificationResult;
use thiserror::Error;

/// Why a classify call failed. Each variant names the stage that failed.
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("fetch failed: {0}")]
    Fetch(FetchError),
    #[error("decode failed: {0}")]
    Decode(PreprocessError),
    #[error("invalid preprocessing parameters: {0}")]
    InvalidParams(String),
    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),
    #[error("ranking failed: {0}")]
    Rank(#[from] RankError),
}

impl From<FetchError> for ClassifyError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidUrl { url, reason } => ClassifyError::InvalidUrl { url, reason },
            other => ClassifyError::Fetch(other),
        }
    }
}

impl From<PreprocessError> for ClassifyError {
    fn from(err: PreprocessError) -> Self {
        match err {
            PreprocessError::InvalidParams(reason) => ClassifyError::InvalidParams(reason),
            decode => ClassifyError::Decode(decode),
        }
    }
}

impl ClassifyError {
    /// Short name of the pipeline stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            ClassifyError::InvalidUrl { .. } => "url",
            ClassifyError::Fetch(_) => "fetch",
            ClassifyError::Decode(_) => "preprocess",
            ClassifyError::InvalidParams(_) => "params",
            ClassifyError::Inference(_) => "inference",
            ClassifyError::Rank(_) => "rank",
        }
    }
}

/// One way of classifying the image behind a URL.
pub trait ClassifierBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Fetch, preprocess, infer, and rank. The first failing stage's error
    /// is returned unchanged; there is never a partial result.
    fn classify(&self, url: &str) -> Result<ClassificationResult, ClassifyError>;

    /// The stages this backend runs, for startup reporting.
    fn pipeline(&self) -> &Pipeline;

    fn engine(&self) -> &InferenceEngine {
        self.pipeline().engine()
    }
}

/// Run the initialization phase for the configured backend.
///
/// Loads the model and labels of `config.backend` only. Any failure here is
/// fatal: the process must not serve requests without a loaded model.
pub fn select_backend(
    config: &ClassifierConfig,
    fetcher: impl ImageFetcher + 'static,
) -> Result<Box<dyn ClassifierBackend>, ModelLoadError> {
    let model = config.selected_model();
    let backend: Box<dyn ClassifierBackend> = match config.backend {
        BackendKind::Inception => Box::new(InceptionBackend::load(model, fetcher)?),
        BackendKind::Nin => Box::new(NinBackend::load(model, fetcher)?),
    };
    tracing::info!(backend = %config.backend, "classifier backend ready");
    Ok(backend)
}
