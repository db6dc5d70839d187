//! Fraud Detection Form Library
//!
//! Screens a single transaction against a pre-trained ONNX classifier and
//! serves the result through a small web form.

pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod types;
pub mod web;

pub use config::AppConfig;
pub use error::{ModelError, RecordError};
pub use feature_extractor::FeatureExtractor;
pub use models::inference::{classify, Classifier, InferenceEngine};
pub use models::loader::CachedModel;
pub use types::{TransactionRecord, TransactionType, Verdict};
