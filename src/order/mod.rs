//! Order ingestion: typed extraction helpers, the canonical order model and
//! the normalizer that turns catalog app-data into it.

pub mod extract;
pub mod model;
pub mod normalizer;

use std::fmt;

pub use model::{BuyerIdentity, CanonicalOrder, LineItem};
pub use normalizer::{
    embedded_order_payload, extract_embedded_payload, normalize, normalize_str, parse_payload,
};

/// The one hard failure of order ingestion: the payload is not a JSON object
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadError {
    /// The data is not valid JSON
    Malformed(String),
    /// Valid JSON, but the top-level value is not an object
    NotAnObject(&'static str),
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::Malformed(msg) => write!(f, "Order payload is not valid JSON: {}", msg),
            PayloadError::NotAnObject(kind) => {
                write!(f, "Order payload must be a JSON object, got {}", kind)
            }
        }
    }
}

impl std::error::Error for PayloadError {}
