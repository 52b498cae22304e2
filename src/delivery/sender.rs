//! Outbound message transport used by the fan-out.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ParseMode;

use super::DeliveryError;

/// Sends one HTML-formatted message to one chat
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_html(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError>;
}

#[async_trait]
impl MessageSender for Bot {
    async fn send_html(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError> {
        self.send_message(chat_id, text)
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ())
            .map_err(DeliveryError::from)
    }
}
