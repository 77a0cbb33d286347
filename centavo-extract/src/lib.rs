//! centavo-extract: sender routing and per-bank HTML extractors.
//!
//! Each bank sends transaction notifications in its own unversioned
//! template; extraction is regex/string-search over the raw HTML body.
//! A body that does not carry transactional content (promotions,
//! digests) yields `None`, never an error.

pub mod amounts;
pub mod dates;
pub mod extractors;
pub mod router;

pub use extractors::Extractor;
pub use router::Router;
