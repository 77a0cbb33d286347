//! Per-bank extractors. One module per sender template.

pub mod bac;
pub mod bcr_card;
pub mod bcr_sinpe;
pub mod credix;
pub mod promerica;

use centavo_core::{Bank, TransactionRecord};

/// A bank-specific body parser. Exactly one shape of parsing per
/// implementation; `None` means the body carried no transactional
/// content (an expected, frequent outcome).
pub trait Extractor: Send + Sync {
    fn bank(&self) -> Bank;
    fn extract(&self, html: &str) -> Option<TransactionRecord>;
}

pub use bac::BacExtractor;
pub use bcr_card::BcrCardExtractor;
pub use bcr_sinpe::BcrSinpeExtractor;
pub use credix::CredixExtractor;
pub use promerica::PromericaExtractor;
