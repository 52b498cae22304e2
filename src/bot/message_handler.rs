//! Message Handler module for processing incoming Telegram messages

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, Instrument};

use super::command_handlers::{
    handle_help_command, handle_ping_command, handle_start_command, handle_test_seller_command,
    parse_command, Command,
};
use super::order_handler::{process_order, OrderRequest, OrderSource};
use super::{user_language, BotContext};
use crate::localization::t_lang;
use crate::observability;
use crate::order::embedded_order_payload;

/// Kind of message, used for routing and the message counter
fn message_type(msg: &Message) -> &'static str {
    if msg.web_app_data().is_some() {
        "web_app_data"
    } else if msg.text().is_some() {
        "text"
    } else {
        "unsupported"
    }
}

fn order_request(msg: &Message, data: String, source: OrderSource) -> OrderRequest {
    let user = msg.from.as_ref();
    OrderRequest {
        buyer_chat: msg.chat.id,
        sender_name: user.map(|u| u.full_name()).unwrap_or_default(),
        user_id: user.map(|u| u.id.0),
        language_code: user_language(user).map(str::to_string),
        data,
        source,
    }
}

/// What a text message asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRoute<'a> {
    Command(Command),
    /// A JSON object pasted as text; some clients deliver the catalog payload this way
    Order(&'a str),
    /// Anything else gets the "open the catalog" hint
    Hint,
}

/// Decide how to handle a text message. Text whose braces do not enclose a
/// JSON object is ordinary prose, never a rejected order.
pub fn route_text(text: &str) -> TextRoute<'_> {
    if let Some(command) = parse_command(text) {
        return TextRoute::Command(command);
    }
    match embedded_order_payload(text) {
        Some(payload) => TextRoute::Order(payload),
        None => TextRoute::Hint,
    }
}

async fn handle_text_message(bot: &Bot, msg: &Message, ctx: &BotContext, text: &str) -> Result<()> {
    let language_code = user_language(msg.from.as_ref());

    match route_text(text) {
        TextRoute::Command(command) => {
            debug!(user_id = %msg.chat.id, command = ?command, "Handling command");
            match command {
                Command::Start => handle_start_command(bot, msg, ctx, language_code).await,
                Command::Help => handle_help_command(bot, msg, ctx, language_code).await,
                Command::Ping => handle_ping_command(bot, msg, ctx, language_code).await,
                Command::TestSeller => {
                    handle_test_seller_command(bot, msg, ctx, language_code).await
                }
            }
        }
        TextRoute::Order(payload) => {
            debug!(user_id = %msg.chat.id, "Text message carries an order payload");
            let request = order_request(msg, payload.to_string(), OrderSource::Text);
            process_order(bot, ctx, request).await;
            Ok(())
        }
        TextRoute::Hint => {
            bot.send_message(msg.chat.id, t_lang(&ctx.localization, "text-hint", language_code))
                .await?;
            Ok(())
        }
    }
}

async fn handle_unsupported_message(bot: &Bot, msg: &Message, ctx: &BotContext) -> Result<()> {
    let language_code = user_language(msg.from.as_ref());
    debug!(user_id = %msg.chat.id, "Received unsupported message type from user");

    bot.send_message(
        msg.chat.id,
        t_lang(&ctx.localization, "unsupported-message", language_code),
    )
    .await?;
    Ok(())
}

pub async fn message_handler(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> Result<()> {
    let span = observability::telegram_span("message_handler", msg.from.as_ref().map(|u| u.id.0));

    async {
        let kind = message_type(&msg);
        observability::record_telegram_message(kind);

        if let Some(app_data) = msg.web_app_data() {
            let request = order_request(&msg, app_data.data.clone(), OrderSource::WebApp);
            process_order(&bot, &ctx, request).await;
            Ok(())
        } else if let Some(text) = msg.text() {
            handle_text_message(&bot, &msg, &ctx, text).await
        } else {
            handle_unsupported_message(&bot, &msg, &ctx).await
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_text() {
        assert_eq!(route_text("/start"), TextRoute::Command(Command::Start));
        assert_eq!(
            route_text(r#"my order {"items":[]}"#),
            TextRoute::Order(r#"{"items":[]}"#)
        );
        assert_eq!(route_text("hello"), TextRoute::Hint);
    }

    #[test]
    fn test_braces_in_prose_get_the_hint() {
        assert_eq!(route_text("can you do {gift wrap} please"), TextRoute::Hint);
        assert_eq!(route_text("{1, 2}"), TextRoute::Hint);
        assert_eq!(route_text("{}"), TextRoute::Order("{}"));
    }
}
