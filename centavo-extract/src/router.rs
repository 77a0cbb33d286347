//! Sender → extractor routing.
//!
//! The single source of truth for which senders are transactional:
//! the unread-mail search query is built from `known_senders()`.
//! Adding a bank means one entry here plus one extractor module.

use centavo_core::TransactionRecord;

use crate::extractors::{
    BacExtractor, BcrCardExtractor, BcrSinpeExtractor, CredixExtractor, Extractor,
    PromericaExtractor,
};

/// Ordered registry of (sender substring, extractor) pairs, matched
/// case-insensitively against the From header.
pub struct Router {
    routes: Vec<(&'static str, Box<dyn Extractor>)>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: vec![
                ("bcrtarjestcta@bancobcr.com", Box::new(BcrCardExtractor)),
                (
                    "notificacion@notificacionesbaccr.com",
                    Box::new(BacExtractor),
                ),
                ("info@promerica.fi.cr", Box::new(PromericaExtractor)),
                ("informacion@credix.com", Box::new(CredixExtractor)),
                ("mensajero@bancobcr.com", Box::new(BcrSinpeExtractor)),
            ],
        }
    }

    /// All transactional sender addresses, for building the mail query.
    pub fn known_senders(&self) -> Vec<&'static str> {
        self.routes.iter().map(|(sender, _)| *sender).collect()
    }

    pub fn route(&self, sender: &str) -> Option<&dyn Extractor> {
        let sender = sender.to_lowercase();
        self.routes
            .iter()
            .find(|(pattern, _)| sender.contains(pattern))
            .map(|(_, extractor)| extractor.as_ref())
    }

    /// Route and extract in one step. Unknown senders and
    /// non-transactional bodies both yield `None`.
    pub fn extract(&self, sender: &str, html: &str) -> Option<TransactionRecord> {
        self.route(sender)?.extract(html)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
