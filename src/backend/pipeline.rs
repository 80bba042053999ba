use super::ClassifyError;
use crate::fetch::ImageFetcher;
use crate::inference::InferenceEngine;
use crate::preprocess::{PreprocessParams, preprocess};
use crate::rank::{TopK, rank};
use crate::types::ClassificationResult;
use std::sync::Arc;
use std::time::Instant;

/// Fetch → preprocess → infer → rank, with fixed parameters.
///
/// Holds no per-request state; one pipeline serves any number of
/// concurrent calls.
pub struct Pipeline {
    fetcher: Box<dyn ImageFetcher>,
    engine: Arc<InferenceEngine>,
    params: PreprocessParams,
    top_k: TopK,
}

impl Pipeline {
    pub fn new(
        fetcher: impl ImageFetcher + 'static,
        engine: Arc<InferenceEngine>,
        params: PreprocessParams,
        top_k: TopK,
    ) -> Self {
        Self {
            fetcher: Box::new(fetcher),
            engine,
            params,
            top_k,
        }
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn params(&self) -> &PreprocessParams {
        &self.params
    }

    pub fn top_k(&self) -> TopK {
        self.top_k
    }

    pub fn classify(&self, url: &str) -> Result<ClassificationResult, ClassifyError> {
        let started = Instant::now();
        let result = self.run(url);
        match &result {
            Ok(ranked) => {
                if let Some(best) = ranked.best() {
                    tracing::info!(
                        url,
                        label = best.label(),
                        score = best.score(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "BEST MATCH: {} ({:.2}% likely)",
                        best.label(),
                        best.score() * 100.0
                    );
                }
            }
            Err(err) => tracing::warn!(url, stage = err.stage(), error = %err, "classification failed"),
        }
        result
    }

    fn run(&self, url: &str) -> Result<ClassificationResult, ClassifyError> {
        let bytes = self.fetcher.fetch(url)?;
        tracing::debug!(bytes = bytes.len(), "fetched image");

        let tensor = preprocess(&bytes, &self.params)?;
        tracing::debug!(shape = ?tensor.shape(), "preprocessed image");

        let scores = self.engine.classify(&tensor)?;
        Ok(rank(&scores, self.engine.labels(), self.top_k)?)
    }
}
