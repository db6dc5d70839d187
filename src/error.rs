//! Error types for record validation, model loading and inference

use thiserror::Error;

/// A submitted transaction failed validation before reaching the model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} must be a number, got '{value}'")]
    NotANumber { field: &'static str, value: String },

    #[error("{field} must be a finite non-negative number, got {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("unknown transaction type '{0}'")]
    UnknownType(String),
}

/// Failures surfaced by the model loader and the inference pipeline
#[derive(Debug, Error)]
pub enum ModelError {
    /// The model resource could not be loaded. Inference stays disabled
    /// for the rest of the process lifetime.
    #[error("{message}")]
    ResourceUnavailable { path: String, message: String },

    /// A single prediction failed; later requests are unaffected.
    #[error("An error occurred during prediction: {0:#}")]
    Prediction(anyhow::Error),
}

impl ModelError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ModelError::ResourceUnavailable { .. })
    }
}
