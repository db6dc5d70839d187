//! Feature extraction for fraud classifier inference.
//!
//! Turns a transaction record into the numeric vector the ONNX model was
//! trained on. The transaction type is one-hot expanded in place of the
//! original `type` column; the balances follow in training column order.

use crate::types::transaction::{TransactionRecord, TransactionType};

const FEATURE_NAMES: [&str; 9] = [
    "type_PAYMENT",
    "type_TRANSFER",
    "type_CASH_OUT",
    "type_DEPOSIT",
    "amount",
    "oldbalanceOrg",
    "newbalanceOrig",
    "oldbalanceDest",
    "newbalanceDest",
];

/// Feature extractor that transforms records into model input features.
///
/// Features are extracted in the exact order expected by the ONNX model.
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract features from a record.
    ///
    /// Returns a feature vector matching `feature_names()` (9 features).
    pub fn extract(&self, tx: &TransactionRecord) -> Vec<f32> {
        let mut features = Vec::with_capacity(FEATURE_NAMES.len());

        // One-hot transaction type (4)
        for kind in TransactionType::ALL {
            features.push(if tx.transaction_type == kind { 1.0 } else { 0.0 });
        }

        // Amount and balances (5)
        for (_, value) in tx.numeric_fields() {
            features.push(value as f32);
        }

        features
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_NAMES.len()
    }

    /// Get feature names (matching training order).
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_extraction() {
        let extractor = FeatureExtractor::new();
        let tx = TransactionRecord::new(
            TransactionType::Transfer,
            5000.0,
            10000.0,
            5000.0,
            0.0,
            5000.0,
        )
        .unwrap();

        let features = extractor.extract(&tx);

        assert_eq!(features.len(), extractor.feature_count());
        assert_eq!(
            features,
            vec![0.0, 1.0, 0.0, 0.0, 5000.0, 10000.0, 5000.0, 0.0, 5000.0]
        );
    }

    #[test]
    fn test_one_hot_per_type() {
        let extractor = FeatureExtractor::new();

        for (idx, kind) in TransactionType::ALL.into_iter().enumerate() {
            let tx = TransactionRecord {
                transaction_type: kind,
                ..TransactionRecord::default()
            };
            let features = extractor.extract(&tx);
            let hot: Vec<usize> = features[..4]
                .iter()
                .enumerate()
                .filter(|(_, &v)| v == 1.0)
                .map(|(i, _)| i)
                .collect();
            assert_eq!(hot, vec![idx]);
            assert_eq!(extractor.feature_names()[idx], format!("type_{}", kind));
        }
    }

    #[test]
    fn test_feature_count() {
        let extractor = FeatureExtractor::new();
        assert_eq!(extractor.feature_count(), 9);
        assert_eq!(extractor.feature_names().len(), 9);
    }
}
