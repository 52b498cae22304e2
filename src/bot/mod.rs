//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: Routes incoming messages (app data, commands, text)
//! - `command_handlers`: `/start`, `/help`, `/ping` and `/test_seller`
//! - `order_handler`: Catalog order pipeline from payload to acknowledgement
//! - `ui_builder`: Creates keyboards and formats messages

pub mod command_handlers;
pub mod message_handler;
pub mod order_handler;
pub mod ui_builder;

use std::sync::Arc;

use teloxide::types::User;

use crate::config::AppConfig;
use crate::delivery::ReceiptLabels;
use crate::localization::LocalizationManager;

/// Shared, read-only dependencies of every handler
#[derive(Debug)]
pub struct BotContext {
    pub config: Arc<AppConfig>,
    pub localization: Arc<LocalizationManager>,
    /// Receipt labels in the configured receipt language
    pub receipt_labels: ReceiptLabels,
}

impl BotContext {
    pub fn new(config: Arc<AppConfig>, localization: Arc<LocalizationManager>) -> Arc<Self> {
        let language = localization.detect_language(Some(&config.delivery.receipt_language));
        let receipt_labels = ReceiptLabels::from_localization(&localization, &language);
        Arc::new(Self {
            config,
            localization,
            receipt_labels,
        })
    }
}

/// Language code reported by Telegram for the sender, if any
pub fn user_language(user: Option<&User>) -> Option<&str> {
    user.and_then(|u| u.language_code.as_deref())
}

// Re-export main handler functions for use in main.rs
pub use message_handler::{message_handler, route_text, TextRoute};
pub use order_handler::{process_order, OrderOutcome, OrderRequest, OrderSource};
pub use ui_builder::create_catalog_keyboard;
