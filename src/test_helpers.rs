//! Shared test utilities for the classifier test suite.
//!
//! Provides in-memory image builders and stand-ins for the two I/O seams
//! of the pipeline (image fetching and model execution), so pipeline logic
//! can be exercised without network access or model files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let fetcher = StaticFetcher::new("http://img/red.png", solid_png(10, 10, [255, 0, 0]));
//! let model = FixedModel::new(vec![1, 2], vec![0.9, 0.1]);
//! let engine = InferenceEngine::new(model, vocabulary(&["red", "blue"]));
//! ```
//!
//! [`pooling_onnx`] builds a real, tiny ONNX graph for tests that go through
//! the tract runtime.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use prost::Message;
use tract_onnx::pb;

use crate::fetch::{FetchError, ImageFetcher, parse_url};
use crate::inference::{InferenceError, LabelVocabulary, Model, ModelOutput};
use crate::preprocess::ImageTensor;

// =========================================================================
// Images
// =========================================================================

/// Encode any image as PNG bytes.
pub fn encode_png(image: &DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// A `width`×`height` PNG filled with one colour.
pub fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    encode_png(&DynamicImage::ImageRgb8(RgbImage::from_pixel(
        width,
        height,
        Rgb(rgb),
    )))
}

/// A PNG with a diagonal gradient, so resizing has real work to do.
pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    });
    encode_png(&DynamicImage::ImageRgb8(image))
}

// =========================================================================
// ONNX graphs
// =========================================================================

fn float_value(name: &str, dims: &[i64]) -> pb::ValueInfoProto {
    use pb::tensor_shape_proto::{Dimension, dimension};

    let tensor = pb::type_proto::Tensor {
        elem_type: pb::tensor_proto::DataType::Float as i32,
        shape: Some(pb::TensorShapeProto {
            dim: dims
                .iter()
                .map(|&d| Dimension {
                    value: Some(dimension::Value::DimValue(d)),
                    ..Default::default()
                })
                .collect(),
        }),
    };
    pb::ValueInfoProto {
        name: name.to_string(),
        r#type: Some(pb::TypeProto {
            value: Some(pb::type_proto::Value::TensorType(tensor)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn spatial_reduce(op_type: &str, output: &str) -> pb::NodeProto {
    use pb::attribute_proto::AttributeType;

    pb::NodeProto {
        name: output.to_string(),
        op_type: op_type.to_string(),
        input: vec!["image".to_string()],
        output: vec![output.to_string()],
        attribute: vec![
            pb::AttributeProto {
                name: "axes".to_string(),
                r#type: AttributeType::Ints as i32,
                ints: vec![1, 2],
                ..Default::default()
            },
            pb::AttributeProto {
                name: "keepdims".to_string(),
                r#type: AttributeType::Int as i32,
                i: 0,
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

/// Serialized ONNX model taking `image` `[1, 2, 2, channels]` and producing
/// `mean_scores` then `max_scores`, both `[1, channels]`, pooled over the
/// two spatial axes.
pub fn pooling_onnx(channels: i64) -> Vec<u8> {
    let model = pb::ModelProto {
        ir_version: 7,
        opset_import: vec![pb::OperatorSetIdProto {
            domain: String::new(),
            version: 13,
        }],
        graph: Some(pb::GraphProto {
            name: "pooling".to_string(),
            node: vec![
                spatial_reduce("ReduceMean", "mean_scores"),
                spatial_reduce("ReduceMax", "max_scores"),
            ],
            input: vec![float_value("image", &[1, 2, 2, channels])],
            output: vec![
                float_value("mean_scores", &[1, channels]),
                float_value("max_scores", &[1, channels]),
            ],
            ..Default::default()
        }),
        ..Default::default()
    };
    model.encode_to_vec()
}

/// `[1, 2, 2, 3]` input whose pixel `p` (row-major) holds `10 * p + c` in
/// channel `c`: channel means are `15, 16, 17`, maxima `30, 31, 32`.
pub fn pooling_input() -> ImageTensor {
    ImageTensor::from_shape_fn((1, 2, 2, 3), |(_, y, x, c)| ((y * 2 + x) * 10 + c) as f32)
}

// =========================================================================
// Vocabulary
// =========================================================================

pub fn vocabulary(labels: &[&str]) -> LabelVocabulary {
    LabelVocabulary::new(labels.iter().map(|l| l.to_string()).collect())
}

// =========================================================================
// Fetcher stand-in
// =========================================================================

/// Serves canned bytes per URL; unknown URLs answer HTTP 404.
///
/// URLs still go through [`parse_url`], so malformed ones fail exactly like
/// they do against the real fetcher.
#[derive(Default)]
pub struct StaticFetcher {
    images: HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(url: &str, bytes: Vec<u8>) -> Self {
        Self {
            images: HashMap::from([(url.to_string(), bytes)]),
        }
    }
}

impl ImageFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        parse_url(url)?;
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

// =========================================================================
// Model stand-in
// =========================================================================

/// Returns the same output for every input and counts its calls.
pub struct FixedModel {
    shape: Vec<usize>,
    values: Vec<f64>,
    calls: Arc<AtomicUsize>,
}

impl FixedModel {
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Self {
        Self {
            shape,
            values,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared call counter; stays readable after the model moves into an engine.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Model for FixedModel {
    fn run(&self, _input: &ImageTensor) -> Result<ModelOutput, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ModelOutput {
            shape: self.shape.clone(),
            values: self.values.clone(),
        })
    }
}
