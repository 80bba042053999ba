use super::{ClassifierBackend, ClassifyError, Pipeline};
use crate::config::{BackendKind, ModelConfig};
use crate::fetch::ImageFetcher;
use crate::inference::{InferenceEngine, ModelFormat, ModelLoadError};
use crate::preprocess::{Channels, PreprocessParams};
use crate::rank::TopK;
use crate::types::ClassificationResult;
use std::sync::Arc;

/// TensorFlow Inception graph.
///
/// The model was trained on 224×224 RGB images converted to float with
/// `(value - 117) / 1`. Returns every label, ranked.
pub struct InceptionBackend {
    pipeline: Pipeline,
}

impl InceptionBackend {
    pub const PARAMS: PreprocessParams = PreprocessParams {
        target_width: 224,
        target_height: 224,
        channels: Channels::Rgb,
        mean: 117.0,
        scale: 1.0,
    };
    pub const TOP_K: TopK = TopK::All;
    /// Input and output node names of the stock TensorFlow graph.
    pub const GRAPH_INPUT: &'static str = "input";
    pub const GRAPH_OUTPUT: &'static str = "final_result";

    pub fn new(engine: Arc<InferenceEngine>, fetcher: impl ImageFetcher + 'static) -> Self {
        Self {
            pipeline: Pipeline::new(fetcher, engine, Self::PARAMS, Self::TOP_K),
        }
    }

    pub fn load(
        model: &ModelConfig,
        fetcher: impl ImageFetcher + 'static,
    ) -> Result<Self, ModelLoadError> {
        let engine = InferenceEngine::load(&Self::graph_config(model), Self::PARAMS.shape())?;
        Ok(Self::new(Arc::new(engine), fetcher))
    }

    /// Fill in the stock node names for TensorFlow artifacts. ONNX artifacts
    /// keep whatever was configured, which may be nothing.
    fn graph_config(model: &ModelConfig) -> ModelConfig {
        let mut model = model.clone();
        if model.resolved_format() == Some(ModelFormat::Tensorflow) {
            model
                .input_node
                .get_or_insert_with(|| Self::GRAPH_INPUT.to_string());
            model
                .output_node
                .get_or_insert_with(|| Self::GRAPH_OUTPUT.to_string());
        }
        model
    }
}

impl ClassifierBackend for InceptionBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Inception
    }

    fn classify(&self, url: &str) -> Result<ClassificationResult, ClassifyError> {
        self.pipeline.classify(url)
    }

    fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

/// Network-in-Network ImageNet classifier.
///
/// 224×224 RGB normalized with the channel-averaged ImageNet mean and
/// standard deviation (114.5, 57.6). Returns the five best labels.
pub struct NinBackend {
    pipeline: Pipeline,
}

impl NinBackend {
    pub const PARAMS: PreprocessParams = PreprocessParams {
        target_width: 224,
        target_height: 224,
        channels: Channels::Rgb,
        mean: 114.5,
        scale: 57.6,
    };
    pub const TOP_K: TopK = TopK::First(5);

    pub fn new(engine: Arc<InferenceEngine>, fetcher: impl ImageFetcher + 'static) -> Self {
        Self {
            pipeline: Pipeline::new(fetcher, engine, Self::PARAMS, Self::TOP_K),
        }
    }

    pub fn load(
        model: &ModelConfig,
        fetcher: impl ImageFetcher + 'static,
    ) -> Result<Self, ModelLoadError> {
        let engine = InferenceEngine::load(model, Self::PARAMS.shape())?;
        Ok(Self::new(Arc::new(engine), fetcher))
    }
}

impl ClassifierBackend for NinBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Nin
    }

    fn classify(&self, url: &str) -> Result<ClassificationResult, ClassifyError> {
        self.pipeline.classify(url)
    }

    fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}
