//! centavo-core: Core types for the bank-notification-to-ledger pipeline

pub mod dedup;
pub mod transaction;

pub use dedup::{DedupIndex, amount_key, natural_key};
pub use transaction::{Bank, Currency, TransactionRecord};
