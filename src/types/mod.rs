//! Type definitions for transaction screening

pub mod transaction;
pub mod verdict;

pub use transaction::{TransactionRecord, TransactionType};
pub use verdict::Verdict;
