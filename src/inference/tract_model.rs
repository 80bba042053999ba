//! [`Model`] backed by the pure-Rust `tract` runtime.
//!
//! | Format | Loader |
//! |---|---|
//! | ONNX (`.onnx`) | `tract_onnx::onnx()` |
//! | Frozen TensorFlow graph (`.pb`) | `tract_tensorflow::tensorflow()` |
//!
//! Both parse into the same inference model, which is pinned to the
//! backend's input shape, optimized once, and turned into a runnable plan.
//! `SimplePlan::run` builds a fresh `SimpleState` per call, so one plan can
//! serve concurrent requests.

use super::engine::{InferenceError, Model, ModelLoadError, ModelOutput};
use crate::config::ModelConfig;
use crate::preprocess::ImageTensor;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use tract_onnx::prelude::*;

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// Serialized model graph format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Onnx,
    Tensorflow,
}

impl ModelFormat {
    /// Infer the format from a file extension (`.onnx`, `.pb`).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("onnx") {
            Some(ModelFormat::Onnx)
        } else if ext.eq_ignore_ascii_case("pb") {
            Some(ModelFormat::Tensorflow)
        } else {
            None
        }
    }
}

pub struct TractModel {
    plan: Plan,
}

impl TractModel {
    /// Parse `bytes` as the model described by `config`, fixed to `input_shape`.
    pub fn from_bytes(
        bytes: &[u8],
        config: &ModelConfig,
        input_shape: [usize; 4],
    ) -> Result<Self, ModelLoadError> {
        let path = &config.model_path;
        let format = config
            .resolved_format()
            .ok_or_else(|| ModelLoadError::UnknownFormat { path: path.clone() })?;

        let parse_err = |e: TractError| ModelLoadError::Parse {
            path: path.clone(),
            reason: format!("{e:#}"),
        };

        let mut reader = Cursor::new(bytes);
        let model = match format {
            ModelFormat::Onnx => tract_onnx::onnx().model_for_read(&mut reader),
            ModelFormat::Tensorflow => tract_tensorflow::tensorflow().model_for_read(&mut reader),
        }
        .map_err(parse_err)?;

        let plan = build_plan(model, config, input_shape).map_err(parse_err)?;
        Ok(Self { plan })
    }

    /// Shape of the scored output, when the graph fixes every dimension.
    pub fn output_shape(&self) -> Option<&[usize]> {
        let fact = self.plan.model().output_fact(0).ok()?;
        fact.shape.as_concrete()
    }
}

fn build_plan(
    mut model: InferenceModel,
    config: &ModelConfig,
    input_shape: [usize; 4],
) -> TractResult<Plan> {
    if let Some(input) = &config.input_node {
        model.set_input_names([input.as_str()])?;
    }
    if let Some(output) = &config.output_node {
        model.set_output_names([output.as_str()])?;
    }
    model
        .with_input_fact(0, f32::fact(input_shape).into())?
        .into_optimized()?
        .into_runnable()
}

impl Model for TractModel {
    fn run(&self, input: &ImageTensor) -> Result<ModelOutput, InferenceError> {
        let exec_err = |e: TractError| InferenceError::Execution(format!("{e:#}"));

        let data: Vec<f32> = input.iter().copied().collect();
        let tensor = Tensor::from_shape(input.shape(), &data).map_err(exec_err)?;
        let outputs = self.plan.run(tvec!(tensor.into())).map_err(exec_err)?;
        let output = outputs
            .first()
            .ok_or_else(|| InferenceError::Execution("model produced no outputs".into()))?;
        let view = output.to_array_view::<f32>().map_err(exec_err)?;

        Ok(ModelOutput {
            shape: view.shape().to_vec(),
            values: view.iter().map(|&v| f64::from(v)).collect(),
        })
    }
}
