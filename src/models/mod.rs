//! Model loading and inference components

pub mod inference;
pub mod loader;

pub use inference::{classify, Classifier, InferenceEngine};
pub use loader::{CachedModel, ModelLoader};
