use super::tract_model::TractModel;
use crate::config::ModelConfig;
use crate::preprocess::ImageTensor;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure while loading a model or its labels. Fatal at startup.
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load model {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("cannot infer model format of {}; set `format` to \"onnx\" or \"tensorflow\"", path.display())]
    UnknownFormat { path: PathBuf },
    #[error("label file {} contains no labels", path.display())]
    EmptyVocabulary { path: PathBuf },
    #[error("model {} outputs shape {shape:?} but the label file has {labels} labels", path.display())]
    OutputShape {
        path: PathBuf,
        shape: Vec<usize>,
        labels: usize,
    },
}

/// Failure while running one inference.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("expected model to produce a [1, N] tensor where N is the number of labels, got shape {shape:?}")]
    UnexpectedOutputShape { shape: Vec<usize> },
    #[error("model produced {scores} scores for {labels} labels")]
    VocabularyMismatch { scores: usize, labels: usize },
    #[error("model execution failed: {0}")]
    Execution(String),
}

/// Raw output of one forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    pub shape: Vec<usize>,
    /// Row-major values, `shape.iter().product()` of them.
    pub values: Vec<f64>,
}

/// An opaque function from image tensor to score tensor.
///
/// Implementations are shared across threads and must not keep mutable
/// state between calls: every `run` gets a fresh execution context.
pub trait Model: Send + Sync {
    fn run(&self, input: &ImageTensor) -> Result<ModelOutput, InferenceError>;
}

/// Ordered category names; index `i` names score `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVocabulary {
    labels: Vec<String>,
}

impl LabelVocabulary {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// One label per line. Blank lines inside the list keep their index;
    /// trailing blank lines are dropped.
    pub fn parse(text: &str) -> Self {
        let mut labels: Vec<String> = text.lines().map(|l| l.trim().to_string()).collect();
        while labels.last().is_some_and(|l| l.is_empty()) {
            labels.pop();
        }
        Self { labels }
    }

    pub fn from_file(path: &Path) -> Result<Self, ModelLoadError> {
        let text = fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let vocabulary = Self::parse(&text);
        if vocabulary.is_empty() {
            return Err(ModelLoadError::EmptyVocabulary {
                path: path.to_path_buf(),
            });
        }
        Ok(vocabulary)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A loaded model plus the vocabulary that names its outputs.
///
/// Immutable after construction.
pub struct InferenceEngine {
    model: Box<dyn Model>,
    vocabulary: LabelVocabulary,
    fingerprint: Option<String>,
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("labels", &self.vocabulary.len())
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

impl InferenceEngine {
    pub fn new(model: impl Model + 'static, vocabulary: LabelVocabulary) -> Self {
        Self {
            model: Box::new(model),
            vocabulary,
            fingerprint: None,
        }
    }

    /// Load the model artifact and label list named by `config`.
    ///
    /// `input_shape` is the `[1, H, W, C]` tensor shape the caller will feed.
    pub fn load(config: &ModelConfig, input_shape: [usize; 4]) -> Result<Self, ModelLoadError> {
        let vocabulary = LabelVocabulary::from_file(&config.labels_path)?;
        let bytes = fs::read(&config.model_path).map_err(|source| ModelLoadError::Io {
            path: config.model_path.clone(),
            source,
        })?;
        let fingerprint = format!("{:x}", Sha256::digest(&bytes));
        let model = TractModel::from_bytes(&bytes, config, input_shape)?;

        // Symbolic shapes are only checked per request.
        if let Some(shape) = model.output_shape() {
            if shape != [1, vocabulary.len()].as_slice() {
                return Err(ModelLoadError::OutputShape {
                    path: config.model_path.clone(),
                    shape: shape.to_vec(),
                    labels: vocabulary.len(),
                });
            }
        }

        tracing::info!(
            model = %config.model_path.display(),
            labels = vocabulary.len(),
            sha256 = %fingerprint,
            "loaded model"
        );

        Ok(Self {
            model: Box::new(model),
            vocabulary,
            fingerprint: Some(fingerprint),
        })
    }

    /// Run the model and return one score per label, in label order.
    pub fn classify(&self, tensor: &ImageTensor) -> Result<Vec<f64>, InferenceError> {
        let output = self.model.run(tensor)?;
        tracing::debug!(shape = ?output.shape, "model output");
        let scores = scores_from_output(output)?;
        if scores.len() != self.vocabulary.len() {
            return Err(InferenceError::VocabularyMismatch {
                scores: scores.len(),
                labels: self.vocabulary.len(),
            });
        }
        Ok(scores)
    }

    pub fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }

    pub fn labels(&self) -> &[String] {
        self.vocabulary.labels()
    }

    /// SHA-256 of the model artifact, when loaded from disk.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }
}

/// Accept only `[1, N]` outputs and return their `N` values.
fn scores_from_output(output: ModelOutput) -> Result<Vec<f64>, InferenceError> {
    match output.shape.as_slice() {
        [1, n] if output.values.len() == *n => Ok(output.values),
        [1, n] => Err(InferenceError::Execution(format!(
            "output shape [1, {n}] but {} values",
            output.values.len()
        ))),
        _ => Err(InferenceError::UnexpectedOutputShape {
            shape: output.shape,
        }),
    }
}
