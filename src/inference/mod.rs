//! Model execution.
//!
//! - **Engine**: [`InferenceEngine`] owns a loaded [`Model`] and its
//!   [`LabelVocabulary`], and checks the shape of every output.
//! - **Model**: the [`Model`] trait is the seam between the engine and an
//!   inference runtime. [`TractModel`] is the production implementation;
//!   tests plug in stubs.
//!
//! An engine is built once during startup and shared read-only (`Arc`) by
//! every request. Each [`Model::run`] call uses its own execution state.

mod engine;
mod tract_model;

pub use engine::{
    InferenceEngine, InferenceError, LabelVocabulary, Model, ModelLoadError, ModelOutput,
};
pub use tract_model::{ModelFormat, TractModel};
