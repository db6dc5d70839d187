//! Classification verdicts and their user-facing messages

use serde::{Deserialize, Serialize};

/// Binary outcome of classifying one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Safe,
    Fraud,
}

impl Verdict {
    /// Interpret a raw model label. Only 0 and 1 are meaningful.
    pub fn from_label(label: i64) -> Option<Self> {
        match label {
            0 => Some(Verdict::Safe),
            1 => Some(Verdict::Fraud),
            _ => None,
        }
    }

    pub fn label(&self) -> i64 {
        match self {
            Verdict::Safe => 0,
            Verdict::Fraud => 1,
        }
    }

    pub fn is_fraud(&self) -> bool {
        matches!(self, Verdict::Fraud)
    }

    /// Message shown to the user for this verdict
    pub fn message(&self) -> &'static str {
        match self {
            Verdict::Fraud => "🚨 ALERT: This transaction is classified as FRAUD.",
            Verdict::Safe => "✅ This transaction appears SAFE.",
        }
    }
}
