//! Classifier configuration.
//!
//! Loaded once at startup from a TOML file (default `classifier.toml`).
//! Stock defaults are serialized to a TOML value and the user's file is
//! merged on top, so a config file only needs the keys it changes:
//!
//! ```toml
//! backend = "nin"
//!
//! [nin]
//! model_path = "/srv/models/nin_imagenet.onnx"
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! backend = "inception"     # Which classifier backend serves requests: "inception" | "nin"
//!
//! [fetch]
//! timeout_secs = 30         # Whole-request timeout for image downloads
//! max_bytes = 20971520      # Largest accepted image body (20 MiB)
//! user_agent = "image-classifier/0.1.0"
//! allow_file_urls = false   # Serve file:// URLs from the local filesystem
//!
//! [inception]
//! model_path = "models/inception/tensorflow_inception_graph.pb"
//! labels_path = "models/inception/imagenet_comp_graph_label_strings.txt"
//! # input_node = "input"    # TensorFlow graphs default to "input" / "final_result";
//! # output_node = "final_result"   # ONNX uses the model's first input and output
//!
//! [nin]
//! model_path = "models/nin/nin_imagenet.onnx"
//! labels_path = "models/nin/synset_words.txt"
//! ```
//!
//! Only the selected backend's model section is loaded. Preprocessing
//! constants are not configurable; they live with each backend variant.
//! Unknown keys are rejected to catch typos early.

use crate::inference::ModelFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "classifier.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Which classifier backend handles requests for the life of the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// TensorFlow Inception graph; returns every label, ranked.
    #[default]
    Inception,
    /// Network-in-Network ImageNet model; returns the top five labels.
    Nin,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Inception => "inception",
            BackendKind::Nin => "nin",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Backend selected at startup.
    pub backend: BackendKind,
    /// Image download settings.
    pub fetch: FetchConfig,
    /// Model artifacts for the Inception backend.
    pub inception: ModelConfig,
    /// Model artifacts for the Network-in-Network backend.
    pub nin: ModelConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            fetch: FetchConfig::default(),
            inception: ModelConfig::inception_defaults(),
            nin: ModelConfig::nin_defaults(),
        }
    }
}

impl ClassifierConfig {
    /// Model artifacts for the given backend.
    pub fn model(&self, kind: BackendKind) -> &ModelConfig {
        match kind {
            BackendKind::Inception => &self.inception,
            BackendKind::Nin => &self.nin,
        }
    }

    /// Model artifacts for the selected backend.
    pub fn selected_model(&self) -> &ModelConfig {
        self.model(self.backend)
    }

    /// Validate values that would otherwise fail confusingly at request time.
    ///
    /// Only the selected backend's model section is checked; the other one
    /// is never loaded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "fetch.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.fetch.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "fetch.max_bytes must be greater than 0".into(),
            ));
        }
        let model = self.selected_model();
        let section = self.backend.name();
        if model.model_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{section}.model_path must not be empty"
            )));
        }
        if model.labels_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{section}.labels_path must not be empty"
            )));
        }
        Ok(())
    }
}

/// Image download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Whole-request timeout in seconds (connect + transfer).
    pub timeout_secs: u64,
    /// Largest accepted response body in bytes.
    pub max_bytes: u64,
    /// `User-Agent` header sent with HTTP requests.
    pub user_agent: String,
    /// Accept `file://` URLs. Off unless the caller is trusted with the
    /// local filesystem.
    pub allow_file_urls: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_bytes: 20 * 1024 * 1024,
            user_agent: concat!("image-classifier/", env!("CARGO_PKG_VERSION")).to_string(),
            allow_file_urls: false,
        }
    }
}

/// Where to find a backend's model artifact and label list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Serialized model graph (`.onnx` or frozen TensorFlow `.pb`).
    pub model_path: PathBuf,
    /// Label list, one label per line, line `i` naming output index `i`.
    pub labels_path: PathBuf,
    /// Artifact format. Inferred from the `model_path` extension when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ModelFormat>,
    /// Graph node fed with the image tensor. When absent, the backend's
    /// default for the artifact format applies, else the model's first input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_node: Option<String>,
    /// Graph node read back as the score vector. When absent, the backend's
    /// default for the artifact format applies, else the model's first output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_node: Option<String>,
}

impl ModelConfig {
    /// Explicit `format`, else the one implied by the `model_path` extension.
    pub fn resolved_format(&self) -> Option<ModelFormat> {
        self.format.or_else(|| ModelFormat::from_path(&self.model_path))
    }

    pub fn inception_defaults() -> Self {
        Self {
            model_path: "models/inception/tensorflow_inception_graph.pb".into(),
            labels_path: "models/inception/imagenet_comp_graph_label_strings.txt".into(),
            format: None,
            input_node: None,
            output_node: None,
        }
    }

    pub fn nin_defaults() -> Self {
        Self {
            model_path: "models/nin/nin_imagenet.onnx".into(),
            labels_path: "models/nin/synset_words.txt".into(),
            format: None,
            input_node: None,
            output_node: None,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ClassifierConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ClassifierConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ClassifierConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when it is missing.
pub fn load_config(path: &Path) -> Result<ClassifierConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config file.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Image Classifier Configuration
# =============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Classifier backend used for every request. Changing it requires a restart.
#   "inception" - TensorFlow Inception graph, 224x224, returns all labels ranked
#   "nin"       - Network-in-Network ImageNet model, 224x224, returns the top 5
backend = "inception"

# ---------------------------------------------------------------------------
# Image download
# ---------------------------------------------------------------------------
[fetch]
# Whole-request timeout in seconds. There is no retry.
timeout_secs = 30

# Largest accepted image body, in bytes.
max_bytes = 20971520

# User-Agent header sent with HTTP requests.
# user_agent = "image-classifier/<version>"

# Accept file:// URLs and read them from the local filesystem.
allow_file_urls = false

# ---------------------------------------------------------------------------
# Inception backend
# ---------------------------------------------------------------------------
[inception]
# Model artifact. ".pb" is read as a frozen TensorFlow graph, ".onnx" as ONNX.
model_path = "models/inception/tensorflow_inception_graph.pb"

# One label per line; line N names output index N.
labels_path = "models/inception/imagenet_comp_graph_label_strings.txt"

# Override the format inferred from the file extension: "onnx" | "tensorflow"
# format = "tensorflow"

# Graph nodes holding the image input and the score output. For TensorFlow
# graphs they default to the stock Inception names below; ONNX artifacts
# use the model's first input and output.
# input_node = "input"
# output_node = "final_result"

# ---------------------------------------------------------------------------
# Network-in-Network backend
# ---------------------------------------------------------------------------
[nin]
model_path = "models/nin/nin_imagenet.onnx"
labels_path = "models/nin/synset_words.txt"
# input_node = "data"
# output_node = "prob"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_selects_inception() {
        let config = ClassifierConfig::default();
        assert_eq!(config.backend, BackendKind::Inception);
        assert_eq!(config.selected_model(), &ModelConfig::inception_defaults());
        assert_eq!(config.inception.input_node, None);
        assert_eq!(config.inception.output_node, None);
    }

    #[test]
    fn default_fetch_settings() {
        let config = ClassifierConfig::default();
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.fetch.max_bytes, 20 * 1024 * 1024);
        assert!(config.fetch.user_agent.starts_with("image-classifier/"));
        assert!(!config.fetch.allow_file_urls);
    }

    #[test]
    fn parse_backend_flag() {
        let config: ClassifierConfig = toml::from_str(r#"backend = "nin""#).unwrap();
        assert_eq!(config.backend, BackendKind::Nin);
        assert_eq!(config.selected_model(), &ModelConfig::nin_defaults());
    }

    #[test]
    fn unknown_backend_rejected() {
        let result: Result<ClassifierConfig, _> = toml::from_str(r#"backend = "boofcv""#);
        assert!(result.is_err());
    }

    #[test]
    fn parse_model_format() {
        let config: ClassifierConfig = toml::from_str(
            r#"
[nin]
model_path = "nin.bin"
labels_path = "labels.txt"
format = "onnx"
"#,
        )
        .unwrap();
        assert_eq!(config.nin.format, Some(ModelFormat::Onnx));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("classifier.toml")).unwrap();
        assert_eq!(config.backend, BackendKind::Inception);
        assert_eq!(config.nin, ModelConfig::nin_defaults());
    }

    #[test]
    fn load_config_merges_partial_section_onto_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("classifier.toml");
        fs::write(
            &path,
            r#"
backend = "nin"

[nin]
model_path = "/srv/models/nin.onnx"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.backend, BackendKind::Nin);
        assert_eq!(config.nin.model_path, PathBuf::from("/srv/models/nin.onnx"));
        // Unspecified values come from stock defaults
        assert_eq!(
            config.nin.labels_path,
            PathBuf::from("models/nin/synset_words.txt")
        );
        assert_eq!(config.fetch.timeout_secs, 30);
    }

    #[test]
    fn onnx_inception_artifact_leaves_node_names_unset() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("classifier.toml");
        fs::write(
            &path,
            r#"
[inception]
model_path = "my_inception.onnx"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.inception.input_node, None);
        assert_eq!(config.inception.output_node, None);
        assert_eq!(config.inception.resolved_format(), Some(ModelFormat::Onnx));
    }

    #[test]
    fn resolved_format_prefers_explicit_format() {
        let model = ModelConfig {
            model_path: "graph.bin".into(),
            format: Some(ModelFormat::Tensorflow),
            ..ModelConfig::default()
        };
        assert_eq!(model.resolved_format(), Some(ModelFormat::Tensorflow));
        assert_eq!(
            ModelConfig::inception_defaults().resolved_format(),
            Some(ModelFormat::Tensorflow)
        );
        assert_eq!(ModelConfig::default().resolved_format(), None);
    }

    #[test]
    fn load_config_enables_file_urls() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("classifier.toml");
        fs::write(&path, "[fetch]\nallow_file_urls = true\n").unwrap();

        assert!(load_config(&path).unwrap().fetch.allow_file_urls);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("classifier.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_rejects_unknown_key() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("classifier.toml");
        fs::write(
            &path,
            r#"
[fetch]
timeout = 5
"#,
        )
        .unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let parsed: ClassifierConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = ClassifierConfig::default();
        assert_eq!(parsed.backend, defaults.backend);
        assert_eq!(parsed.inception, defaults.inception);
        assert_eq!(parsed.nin, defaults.nin);
        assert_eq!(parsed.fetch.timeout_secs, defaults.fetch.timeout_secs);
        assert_eq!(parsed.fetch.max_bytes, defaults.fetch.max_bytes);
        assert_eq!(parsed.fetch.allow_file_urls, defaults.fetch.allow_file_urls);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"backend = "inception""#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"backend = "nin""#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("backend").unwrap().as_str(), Some("nin"));
    }

    #[test]
    fn merge_toml_table_merge_preserves_base_keys() {
        let base: toml::Value = toml::from_str(
            r#"
[fetch]
timeout_secs = 30
max_bytes = 100
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[fetch]
timeout_secs = 5
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let fetch = merged.get("fetch").unwrap();
        assert_eq!(fetch.get("timeout_secs").unwrap().as_integer(), Some(5));
        assert_eq!(fetch.get("max_bytes").unwrap().as_integer(), Some(100));
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_zero_timeout() {
        let mut config = ClassifierConfig::default();
        config.fetch.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_zero_max_bytes() {
        let mut config = ClassifierConfig::default();
        config.fetch.max_bytes = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_checks_only_selected_model() {
        let mut config = ClassifierConfig::default();
        config.nin.labels_path = PathBuf::new();
        assert!(config.validate().is_ok());

        config.backend = BackendKind::Nin;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("nin.labels_path"), "{err}");
    }
}
