//! Transaction data structures submitted for fraud screening

use crate::error::RecordError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of money movement, labelled as in the training data.
///
/// Parsed case-insensitively, from both the form and JSON bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum TransactionType {
    Payment,
    Transfer,
    CashOut,
    Deposit,
}

impl TransactionType {
    /// All types, in the order the form lists them.
    pub const ALL: [TransactionType; 4] = [
        TransactionType::Payment,
        TransactionType::Transfer,
        TransactionType::CashOut,
        TransactionType::Deposit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Payment => "PAYMENT",
            TransactionType::Transfer => "TRANSFER",
            TransactionType::CashOut => "CASH_OUT",
            TransactionType::Deposit => "DEPOSIT",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        TransactionType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| RecordError::UnknownType(trimmed.to_string()))
    }
}

impl TryFrom<String> for TransactionType {
    type Error = RecordError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A single transaction to be classified.
///
/// Field names on the wire follow the training columns; the descriptive
/// camel-case names are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,

    pub amount: f64,

    /// Sender balance before the transaction
    #[serde(rename = "oldbalanceOrg", alias = "senderOldBalance")]
    pub sender_old_balance: f64,

    /// Sender balance after the transaction
    #[serde(rename = "newbalanceOrig", alias = "senderNewBalance")]
    pub sender_new_balance: f64,

    /// Receiver balance before the transaction
    #[serde(rename = "oldbalanceDest", alias = "receiverOldBalance")]
    pub receiver_old_balance: f64,

    /// Receiver balance after the transaction
    #[serde(rename = "newbalanceDest", alias = "receiverNewBalance")]
    pub receiver_new_balance: f64,
}

impl TransactionRecord {
    /// Build a record, rejecting negative or non-finite amounts.
    pub fn new(
        transaction_type: TransactionType,
        amount: f64,
        sender_old_balance: f64,
        sender_new_balance: f64,
        receiver_old_balance: f64,
        receiver_new_balance: f64,
    ) -> Result<Self, RecordError> {
        let record = Self {
            transaction_type,
            amount,
            sender_old_balance,
            sender_new_balance,
            receiver_old_balance,
            receiver_new_balance,
        };
        record.validate()?;
        Ok(record)
    }

    /// Check every numeric field is finite and non-negative.
    ///
    /// Balance arithmetic is deliberately not checked; the model sees the
    /// numbers as submitted.
    pub fn validate(&self) -> Result<(), RecordError> {
        for (field, value) in self.numeric_fields() {
            if !value.is_finite() || value < 0.0 {
                return Err(RecordError::OutOfRange { field, value });
            }
        }
        Ok(())
    }

    /// Numeric fields paired with their column names, in training order.
    pub fn numeric_fields(&self) -> [(&'static str, f64); 5] {
        [
            ("amount", self.amount),
            ("oldbalanceOrg", self.sender_old_balance),
            ("newbalanceOrig", self.sender_new_balance),
            ("oldbalanceDest", self.receiver_old_balance),
            ("newbalanceDest", self.receiver_new_balance),
        ]
    }
}

impl Default for TransactionRecord {
    /// The values the form is pre-filled with.
    fn default() -> Self {
        Self {
            transaction_type: TransactionType::Payment,
            amount: 1000.0,
            sender_old_balance: 10000.0,
            sender_new_balance: 9000.0,
            receiver_old_balance: 0.0,
            receiver_new_balance: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_deserialization_uses_training_columns() {
        let json = r#"{
            "type": "TRANSFER",
            "amount": 5000.0,
            "oldbalanceOrg": 10000.0,
            "newbalanceOrig": 5000.0,
            "oldbalanceDest": 0.0,
            "newbalanceDest": 5000.0
        }"#;

        let tx: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(tx.transaction_type, TransactionType::Transfer);
        assert_eq!(tx.sender_old_balance, 10000.0);
        assert_eq!(tx.receiver_new_balance, 5000.0);

        let out = serde_json::to_value(&tx).unwrap();
        assert_eq!(out["type"], "TRANSFER");
        assert_eq!(out["newbalanceOrig"], 5000.0);
    }

    #[test]
    fn test_transaction_type_json_is_case_insensitive() {
        let tx: TransactionRecord = serde_json::from_value(serde_json::json!({
            "type": "cash_out",
            "amount": 10.0,
            "oldbalanceOrg": 10.0,
            "newbalanceOrig": 0.0,
            "oldbalanceDest": 0.0,
            "newbalanceDest": 10.0
        }))
        .unwrap();
        assert_eq!(tx.transaction_type, TransactionType::CashOut);
        assert_eq!(serde_json::to_value(&tx).unwrap()["type"], "CASH_OUT");

        let err = serde_json::from_str::<TransactionType>(r#""REFUND""#).unwrap_err();
        assert!(err.is_data());
        assert!(err.to_string().contains("unknown transaction type 'REFUND'"));
    }

    #[test]
    fn test_transaction_accepts_descriptive_aliases() {
        let json = r#"{
            "type": "CASH_OUT",
            "amount": 1.5,
            "senderOldBalance": 2.0,
            "senderNewBalance": 0.5,
            "receiverOldBalance": 0.0,
            "receiverNewBalance": 1.5
        }"#;

        let tx: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(tx.transaction_type, TransactionType::CashOut);
        assert_eq!(tx.sender_new_balance, 0.5);
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let json = r#"{"type": "PAYMENT", "amount": 1.0}"#;
        assert!(serde_json::from_str::<TransactionRecord>(json).is_err());
    }

    #[test]
    fn test_validate_rejects_negative_and_nan() {
        let err = TransactionRecord::new(TransactionType::Payment, -5.0, 0.0, 0.0, 0.0, 0.0)
            .unwrap_err();
        assert_eq!(
            err,
            RecordError::OutOfRange {
                field: "amount",
                value: -5.0
            }
        );

        let mut tx = TransactionRecord::default();
        tx.receiver_old_balance = f64::NAN;
        assert!(matches!(
            tx.validate(),
            Err(RecordError::OutOfRange {
                field: "oldbalanceDest",
                ..
            })
        ));
    }

    #[test]
    fn test_balance_arithmetic_not_checked() {
        // Sender loses less than the amount; still a valid record.
        let tx = TransactionRecord::new(TransactionType::Transfer, 500.0, 100.0, 100.0, 0.0, 0.0);
        assert!(tx.is_ok());
    }

    #[test]
    fn test_transaction_type_parsing() {
        assert_eq!("cash_out".parse::<TransactionType>(), Ok(TransactionType::CashOut));
        assert_eq!(" DEPOSIT ".parse::<TransactionType>(), Ok(TransactionType::Deposit));
        assert!("DEBIT".parse::<TransactionType>().is_err());
        assert_eq!(TransactionType::CashOut.to_string(), "CASH_OUT");
    }

    #[test]
    fn test_default_matches_form_defaults() {
        let tx = TransactionRecord::default();
        assert_eq!(tx.transaction_type, TransactionType::Payment);
        assert_eq!(tx.amount, 1000.0);
        assert_eq!(tx.sender_old_balance, 10000.0);
        assert_eq!(tx.sender_new_balance, 9000.0);
        assert!(tx.validate().is_ok());
    }
}
