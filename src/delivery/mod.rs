//! Delivery fan-out: renders a canonical order and sends it to every
//! configured destination, recording the outcome of each send.
//!
//! - `render`: HTML receipt rendering
//! - `targets`: destination resolution from configuration
//! - `sender`: the transport seam (`MessageSender`) and its teloxide implementation
//! - `fanout`: sequential, non-short-circuiting delivery and aggregation

pub mod fanout;
pub mod render;
pub mod sender;
pub mod targets;

use std::fmt;

pub use fanout::{deliver, send_to_targets, Acknowledgement, DeliveryOutcome, DeliveryReport};
pub use render::{render_receipt, ReceiptLabels, MAX_MESSAGE_CHARS};
pub use sender::MessageSender;
pub use targets::{resolve_targets, BuyerCopyPolicy, DeliveryTarget};

/// Failure of a single outbound send
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryError {
    /// Telegram rejected the request (unknown chat, bot blocked, bad markup)
    Api(String),
    /// The request never got a response
    Network(String),
    /// Anything else reported by the transport
    Other(String),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Api(msg) => write!(f, "Telegram API rejected the message: {}", msg),
            DeliveryError::Network(msg) => write!(f, "Network error while sending: {}", msg),
            DeliveryError::Other(msg) => write!(f, "Send failed: {}", msg),
        }
    }
}

impl std::error::Error for DeliveryError {}

impl From<teloxide::RequestError> for DeliveryError {
    fn from(err: teloxide::RequestError) -> Self {
        match err {
            teloxide::RequestError::Api(api) => DeliveryError::Api(api.to_string()),
            teloxide::RequestError::Network(e) => DeliveryError::Network(e.to_string()),
            other => DeliveryError::Other(other.to_string()),
        }
    }
}
