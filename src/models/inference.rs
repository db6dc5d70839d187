//! Classification capability and the inference pipeline

use crate::error::ModelError;
use crate::feature_extractor::FeatureExtractor;
use crate::metrics::AnalysisMetrics;
use crate::models::loader::{CachedModel, LoadedModel};
use crate::types::transaction::TransactionRecord;
use crate::types::verdict::Verdict;
use anyhow::{anyhow, Context, Result};
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// An opaque model that labels a transaction: 0 = safe, 1 = fraud.
///
/// Implementations own whatever state they need and must tolerate being
/// shared across request handlers.
pub trait Classifier: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Predict the raw class label for one record
    fn predict(&self, record: &TransactionRecord) -> Result<i64>;
}

/// Run one record through a classifier and interpret the label.
///
/// Errors and panics raised by the classifier become
/// [`ModelError::Prediction`]. Labels other than 0 or 1 are rejected.
pub fn classify(
    record: &TransactionRecord,
    capability: &dyn Classifier,
) -> Result<Verdict, ModelError> {
    let label = match panic::catch_unwind(AssertUnwindSafe(|| capability.predict(record))) {
        Ok(Ok(label)) => label,
        Ok(Err(e)) => return Err(ModelError::Prediction(e)),
        Err(payload) => {
            return Err(ModelError::Prediction(anyhow!(
                "model '{}' panicked: {}",
                capability.name(),
                panic_message(payload.as_ref())
            )))
        }
    };

    Verdict::from_label(label).ok_or_else(|| {
        ModelError::Prediction(anyhow!(
            "model '{}' returned label {}, expected 0 or 1",
            capability.name(),
            label
        ))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

/// Result of a successful analysis
#[derive(Debug, Clone)]
pub struct Analysis {
    pub request_id: Uuid,
    pub verdict: Verdict,
    pub elapsed: Duration,
}

/// Entry point used by the web layer: guards on model availability,
/// classifies and records metrics.
pub struct InferenceEngine {
    model: Arc<CachedModel>,
    metrics: Arc<AnalysisMetrics>,
}

impl InferenceEngine {
    pub fn new(model: Arc<CachedModel>, metrics: Arc<AnalysisMetrics>) -> Self {
        Self { model, metrics }
    }

    pub fn model(&self) -> &CachedModel {
        &self.model
    }

    pub fn metrics(&self) -> &AnalysisMetrics {
        &self.metrics
    }

    /// Classify one record.
    ///
    /// When the model failed to load this returns `ResourceUnavailable`
    /// without touching any classifier.
    pub fn analyze(&self, record: &TransactionRecord) -> Result<Analysis, ModelError> {
        let request_id = Uuid::new_v4();

        let classifier = match self.model.get() {
            Ok(classifier) => classifier,
            Err(e) => {
                self.metrics.record_unavailable();
                warn!(request_id = %request_id, error = %e, "Analysis rejected, model unavailable");
                return Err(e);
            }
        };

        let start = Instant::now();
        let result = classify(record, classifier.as_ref());
        let elapsed = start.elapsed();

        match result {
            Ok(verdict) => {
                self.metrics.record_verdict(verdict, elapsed);
                info!(
                    request_id = %request_id,
                    transaction_type = %record.transaction_type,
                    amount = record.amount,
                    verdict = ?verdict,
                    processing_time_us = elapsed.as_micros(),
                    "Transaction analyzed"
                );
                Ok(Analysis {
                    request_id,
                    verdict,
                    elapsed,
                })
            }
            Err(e) => {
                self.metrics.record_prediction_error();
                warn!(
                    request_id = %request_id,
                    model = %classifier.name(),
                    error = %e,
                    "Inference failed"
                );
                Err(e)
            }
        }
    }
}

/// Classifier backed by an ONNX Runtime session
pub struct OnnxClassifier {
    name: String,
    /// Session runs need exclusive access
    model: Mutex<LoadedModel>,
    extractor: FeatureExtractor,
    /// Fraud probability cut-off for models without a label output
    threshold: f64,
}

impl OnnxClassifier {
    pub fn new(model: LoadedModel, extractor: FeatureExtractor, threshold: f64) -> Self {
        Self {
            name: model.name.clone(),
            model: Mutex::new(model),
            extractor,
            threshold,
        }
    }

    /// Run the model on a feature vector
    fn run_model(&self, model: &mut LoadedModel, features: &[f32]) -> Result<i64> {
        use ort::value::Tensor;

        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .context("Failed to create input tensor")?;

        let outputs = model
            .session
            .run(ort::inputs![&model.input_name => input_tensor])?;

        if let Some(label_name) = &model.label_output {
            if let Some(output) = outputs.get(label_name.as_str()) {
                let (_, labels) = output
                    .try_extract_tensor::<i64>()
                    .context("Label output is not an int64 tensor")?;
                let label = labels
                    .first()
                    .copied()
                    .ok_or_else(|| anyhow!("Label output is empty"))?;
                debug!(model = %self.name, label = label, "Extracted label");
                return Ok(label);
            }
        }

        let probability_name = model
            .probability_output
            .as_deref()
            .ok_or_else(|| anyhow!("Model produced no usable output"))?;
        let output = outputs
            .get(probability_name)
            .ok_or_else(|| anyhow!("Output '{}' missing from model results", probability_name))?;

        let prob = self.extract_probability(output)?;
        debug!(model = %self.name, prob = prob, threshold = self.threshold, "Extracted fraud probability");
        Ok(i64::from(prob >= self.threshold))
    }

    /// Extract fraud probability from a probability output.
    /// Handles plain tensors and the seq(map(int64, float)) layout of zipmap exports.
    fn extract_probability(&self, output: &ort::value::DynValue) -> Result<f64> {
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            return fraud_prob_from_tensor(shape, data);
        }

        if DynSequenceValueType::can_downcast(&output.dtype()) {
            return self.extract_from_sequence_map(output);
        }

        Err(anyhow!(
            "Unsupported probability output type {:?}",
            output.dtype()
        ))
    }

    /// Extract probability from seq(map(int64, float)) format
    fn extract_from_sequence_map(&self, output: &ort::value::DynValue) -> Result<f64> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow!("Failed to downcast to sequence: {}", e))?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
        let map_value = maps.first().ok_or_else(|| anyhow!("Empty sequence"))?;

        let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

        if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 1) {
            return Ok(*prob as f64);
        }
        if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 0) {
            return Ok(1.0 - *prob as f64);
        }

        Err(anyhow!("No probability found in map"))
    }
}

/// Pick the fraud-class probability out of a [batch, classes] or [classes] tensor
fn fraud_prob_from_tensor(shape: &ort::tensor::Shape, data: &[f32]) -> Result<f64> {
    let classes = shape.iter().last().copied().unwrap_or(0);
    let prob = match classes {
        c if c >= 2 => data.get(1),
        1 => data.first(),
        _ => None,
    };
    prob.map(|&p| p as f64)
        .ok_or_else(|| anyhow!("Probability tensor has unexpected shape {:?}", shape))
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, record: &TransactionRecord) -> Result<i64> {
        let features = self.extractor.extract(record);
        // A panic inside a previous run leaves the session usable
        let mut model = self.model.lock().unwrap_or_else(PoisonError::into_inner);
        self.run_model(&mut model, &features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::transaction::TransactionType;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Stub {
        label: i64,
        calls: AtomicUsize,
    }

    impl Stub {
        fn returning(label: i64) -> Self {
            Self {
                label,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Classifier for Stub {
        fn name(&self) -> &str {
            "stub"
        }

        fn predict(&self, _record: &TransactionRecord) -> Result<i64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.label)
        }
    }

    struct Failing;

    impl Classifier for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn predict(&self, _record: &TransactionRecord) -> Result<i64> {
            Err(anyhow!("feature count mismatch: expected 11, got 9"))
        }
    }

    struct Panicking;

    impl Classifier for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn predict(&self, _record: &TransactionRecord) -> Result<i64> {
            panic!("model state corrupted")
        }
    }

    fn transfer_example() -> TransactionRecord {
        TransactionRecord::new(
            TransactionType::Transfer,
            5000.0,
            10000.0,
            5000.0,
            0.0,
            5000.0,
        )
        .unwrap()
    }

    fn record_strategy() -> impl Strategy<Value = TransactionRecord> {
        let amount = 0.0..1.0e9f64;
        (
            prop::sample::select(TransactionType::ALL.to_vec()),
            amount.clone(),
            amount.clone(),
            amount.clone(),
            amount.clone(),
            amount,
        )
            .prop_map(|(kind, a, so, sn, ro, rn)| {
                TransactionRecord::new(kind, a, so, sn, ro, rn).unwrap()
            })
    }

    proptest! {
        #[test]
        fn prop_label_one_is_fraud(record in record_strategy()) {
            prop_assert_eq!(classify(&record, &Stub::returning(1)).unwrap(), Verdict::Fraud);
        }

        #[test]
        fn prop_label_zero_is_safe(record in record_strategy()) {
            prop_assert_eq!(classify(&record, &Stub::returning(0)).unwrap(), Verdict::Safe);
        }

        #[test]
        fn prop_classify_is_idempotent(record in record_strategy(), label in 0i64..=1) {
            let stub = Stub::returning(label);
            let first = classify(&record, &stub).unwrap();
            let second = classify(&record, &stub).unwrap();
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn test_transfer_example_is_fraud() {
        let stub = Stub::returning(1);
        assert_eq!(classify(&transfer_example(), &stub).unwrap(), Verdict::Fraud);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unexpected_label_is_prediction_error() {
        let err = classify(&transfer_example(), &Stub::returning(2)).unwrap_err();
        assert!(matches!(err, ModelError::Prediction(_)));
        assert!(err.to_string().contains("returned label 2"));
    }

    #[test]
    fn test_classifier_error_is_prediction_error() {
        let err = classify(&transfer_example(), &Failing).unwrap_err();
        assert!(matches!(err, ModelError::Prediction(_)));
        assert!(err.to_string().contains("feature count mismatch"));
    }

    #[test]
    fn test_classifier_panic_is_contained() {
        let err = classify(&transfer_example(), &Panicking).unwrap_err();
        assert!(err.to_string().contains("model state corrupted"));

        // Later requests are still served
        let verdict = classify(&transfer_example(), &Stub::returning(0)).unwrap();
        assert_eq!(verdict, Verdict::Safe);
    }

    #[test]
    fn test_engine_does_not_classify_when_unavailable() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let model = Arc::new(CachedModel::new("missing.onnx", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ModelError::ResourceUnavailable {
                path: "missing.onnx".to_string(),
                message: "Model file 'missing.onnx' not found.".to_string(),
            })
        }));
        let metrics = Arc::new(AnalysisMetrics::new());
        let engine = InferenceEngine::new(model, metrics.clone());

        for _ in 0..3 {
            let err = engine.analyze(&transfer_example()).unwrap_err();
            assert!(err.is_unavailable());
            assert_eq!(err.to_string(), "Model file 'missing.onnx' not found.");
        }

        let snapshot = metrics.snapshot();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(snapshot.rejected_unavailable, 3);
        assert_eq!(snapshot.analyses, 0);
        assert_eq!(snapshot.prediction_errors, 0);
    }

    #[test]
    fn test_engine_classifies_through_ready_model() {
        let stub = Arc::new(Stub::returning(1));
        let model = Arc::new(CachedModel::ready("stub", stub.clone()));
        let metrics = Arc::new(AnalysisMetrics::new());
        let engine = InferenceEngine::new(model, metrics.clone());

        let analysis = engine.analyze(&transfer_example()).unwrap();
        assert_eq!(analysis.verdict, Verdict::Fraud);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.snapshot().analyses, 1);
        assert_eq!(metrics.snapshot().rejected_unavailable, 0);
    }

    #[test]
    fn test_engine_recovers_after_prediction_error() {
        struct FailOnce(AtomicUsize);

        impl Classifier for FailOnce {
            fn name(&self) -> &str {
                "fail-once"
            }

            fn predict(&self, _record: &TransactionRecord) -> Result<i64> {
                if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(anyhow!("transient"))
                } else {
                    Ok(0)
                }
            }
        }

        let model = Arc::new(CachedModel::ready(
            "stub",
            Arc::new(FailOnce(AtomicUsize::new(0))),
        ));
        let metrics = Arc::new(AnalysisMetrics::new());
        let engine = InferenceEngine::new(model, metrics.clone());

        assert!(matches!(
            engine.analyze(&transfer_example()),
            Err(ModelError::Prediction(_))
        ));
        let analysis = engine.analyze(&transfer_example()).unwrap();
        assert_eq!(analysis.verdict, Verdict::Safe);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.prediction_errors, 1);
        assert_eq!(snapshot.safe, 1);
    }
}
