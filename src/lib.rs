//! # Catalog Order Bot
//!
//! A Telegram bot that greets buyers with a button opening a hosted catalog,
//! receives the order the catalog submits through the WebApp data channel and
//! forwards a formatted receipt to the seller, an optional audit log chat and
//! the buyer.

pub mod bot;
pub mod config;
pub mod delivery;
pub mod errors;
pub mod localization;
pub mod observability;
pub mod observability_config;
pub mod order;
pub mod supervisor;

// Re-export types for easier access
pub use delivery::{deliver, DeliveryReport, DeliveryTarget, MessageSender};
pub use order::{normalize, CanonicalOrder, PayloadError};
