//! ONNX model loader and the process-wide model cache

use crate::config::ModelConfig;
use crate::error::ModelError;
use crate::feature_extractor::FeatureExtractor;
use crate::models::inference::{Classifier, OnnxClassifier};
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{error, info, warn};

/// Loaded ONNX model with metadata
pub struct LoadedModel {
    /// Model name
    pub name: String,
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the model
    pub input_name: String,
    /// Output carrying the predicted class, if the model exports one
    pub label_output: Option<String>,
    /// Output carrying class probabilities, if the model exports one
    pub probability_output: Option<String>,
}

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a single ONNX model from file
    pub fn load_model<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<LoadedModel> {
        let path = path.as_ref();

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .context("Model declares no inputs")?;

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        let output_names: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
        let probability_output = probability_output_name(&output_names).map(str::to_string);

        if label_output.is_none() && probability_output.is_none() {
            anyhow::bail!("Model exposes neither a label nor a probability output");
        }

        info!(
            model = %name,
            input = %input_name,
            label = ?label_output,
            probabilities = ?probability_output,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name: name.to_string(),
            session,
            input_name,
            label_output,
            probability_output,
        })
    }
}

/// Pick the output carrying class probabilities.
///
/// A name mentioning "prob" wins, then any other non-label "output", then the
/// last non-label output.
fn probability_output_name<'a>(names: &[&'a str]) -> Option<&'a str> {
    let not_label = || names.iter().copied().filter(|n| !n.contains("label"));
    names
        .iter()
        .copied()
        .find(|n| n.contains("prob"))
        .or_else(|| not_label().find(|n| n.contains("output")))
        .or_else(|| not_label().last())
}

/// Feature layout recorded by the training pipeline next to the model
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureSchema {
    pub features: Vec<String>,
}

impl FeatureSchema {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read feature schema {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse feature schema {}", path.display()))
    }

    /// Require the schema to list exactly the extractor's features, in order.
    pub fn check(&self, extractor: &FeatureExtractor) -> Result<()> {
        let expected = extractor.feature_names();
        if self.features.len() != expected.len() {
            anyhow::bail!(
                "Feature schema lists {} features, extractor produces {}",
                self.features.len(),
                expected.len()
            );
        }
        for (idx, (got, want)) in self.features.iter().zip(expected).enumerate() {
            if got != want {
                anyhow::bail!("Feature {idx} is '{got}' in schema, expected '{want}'");
            }
        }
        Ok(())
    }
}

/// Load the configured ONNX model and wrap it as a classifier.
pub fn load_classifier(config: &ModelConfig) -> Result<Arc<dyn Classifier>, ModelError> {
    let path = Path::new(&config.path);
    if !path.is_file() {
        return Err(ModelError::ResourceUnavailable {
            path: config.path.clone(),
            message: format!("Model file '{}' not found.", config.path),
        });
    }

    let unavailable = |e: anyhow::Error| ModelError::ResourceUnavailable {
        path: config.path.clone(),
        message: format!("Model file '{}' could not be loaded: {:#}", config.path, e),
    };

    let extractor = FeatureExtractor::new();
    if let Some(schema_path) = &config.schema_path {
        FeatureSchema::from_file(schema_path)
            .and_then(|schema| schema.check(&extractor))
            .map_err(unavailable)?;
        info!(schema = %schema_path, "Feature schema matches extractor");
    } else {
        warn!("No feature schema configured; feature order is not verified against the model");
    }

    let model = ModelLoader::with_threads(config.onnx_threads)
        .and_then(|loader| loader.load_model(path, "fraud_detection"))
        .map_err(unavailable)?;

    Ok(Arc::new(OnnxClassifier::new(
        model,
        extractor,
        config.probability_threshold,
    )))
}

type LoadFn = Box<dyn Fn() -> Result<Arc<dyn Classifier>, ModelError> + Send + Sync>;

/// Outcome of the one-time model load
pub enum ModelState {
    Ready(Arc<dyn Classifier>),
    Unavailable { path: String, message: String },
}

/// Process-wide model handle.
///
/// The load runs on first access and its outcome, success or failure, is
/// kept until the handle is dropped at shutdown. There is no reload.
pub struct CachedModel {
    resource: String,
    state: OnceLock<ModelState>,
    init: LoadFn,
}

impl CachedModel {
    /// Cache the outcome of an arbitrary load function
    pub fn new<F>(resource: impl Into<String>, init: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Classifier>, ModelError> + Send + Sync + 'static,
    {
        Self {
            resource: resource.into(),
            state: OnceLock::new(),
            init: Box::new(init),
        }
    }

    /// Cache the ONNX model named by the configuration
    pub fn from_config(config: &ModelConfig) -> Self {
        let config = config.clone();
        Self::new(config.path.clone(), move || load_classifier(&config))
    }

    /// Wrap an already constructed classifier
    pub fn ready(resource: impl Into<String>, classifier: Arc<dyn Classifier>) -> Self {
        let cached = Self::new(resource, || {
            Err(ModelError::ResourceUnavailable {
                path: String::new(),
                message: "model already initialised".to_string(),
            })
        });
        let _ = cached.state.set(ModelState::Ready(classifier));
        cached
    }

    /// Return the model state, loading it on first call
    pub fn state(&self) -> &ModelState {
        self.state.get_or_init(|| match (self.init)() {
            Ok(classifier) => {
                info!(resource = %self.resource, model = %classifier.name(), "Classification model ready");
                ModelState::Ready(classifier)
            }
            Err(e) => {
                error!(resource = %self.resource, error = %e, "Classification model unavailable, inference disabled");
                let (path, message) = match e {
                    ModelError::ResourceUnavailable { path, message } => (path, message),
                    other => (self.resource.clone(), other.to_string()),
                };
                ModelState::Unavailable { path, message }
            }
        })
    }

    /// Return the classifier, or the load failure as `ResourceUnavailable`
    pub fn get(&self) -> Result<Arc<dyn Classifier>, ModelError> {
        match self.state() {
            ModelState::Ready(classifier) => Ok(Arc::clone(classifier)),
            ModelState::Unavailable { path, message } => Err(ModelError::ResourceUnavailable {
                path: path.clone(),
                message: message.clone(),
            }),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state(), ModelState::Ready(_))
    }

    /// Notice to show while inference is disabled
    pub fn unavailable_notice(&self) -> Option<&str> {
        match self.state() {
            ModelState::Ready(_) => None,
            ModelState::Unavailable { message, .. } => Some(message),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }
}
