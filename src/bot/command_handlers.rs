//! Command Handlers module for processing bot commands

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::html::escape;
use tracing::{debug, info};

use super::ui_builder::{create_catalog_keyboard, format_help_message, format_welcome_message};
use super::BotContext;
use crate::delivery::MessageSender;
use crate::errors::error_logging::log_delivery_error;
use crate::localization::{t_args_lang, t_lang};

/// Commands understood by the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Ping,
    TestSeller,
}

/// Parse a command from message text.
///
/// Accepts the `/cmd@BotName` form Telegram uses in groups and ignores any
/// arguments after the command word.
pub fn parse_command(text: &str) -> Option<Command> {
    let word = text.split_whitespace().next()?;
    let name = word.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);

    match name.to_lowercase().as_str() {
        "start" => Some(Command::Start),
        "help" => Some(Command::Help),
        "ping" => Some(Command::Ping),
        "test_seller" => Some(Command::TestSeller),
        _ => None,
    }
}

/// Handle the /start command: greeting plus the catalog button
pub async fn handle_start_command(
    bot: &Bot,
    msg: &Message,
    ctx: &BotContext,
    language_code: Option<&str>,
) -> Result<()> {
    let url = ctx.config.catalog.url()?;
    let keyboard = create_catalog_keyboard(
        &url,
        &t_lang(&ctx.localization, "catalog-button", language_code),
    );

    bot.send_message(
        msg.chat.id,
        format_welcome_message(&ctx.localization, language_code),
    )
    .reply_markup(keyboard)
    .await?;
    Ok(())
}

/// Handle the /help command
pub async fn handle_help_command(
    bot: &Bot,
    msg: &Message,
    ctx: &BotContext,
    language_code: Option<&str>,
) -> Result<()> {
    bot.send_message(msg.chat.id, format_help_message(&ctx.localization, language_code))
        .await?;
    Ok(())
}

/// Handle the /ping command
pub async fn handle_ping_command(
    bot: &Bot,
    msg: &Message,
    ctx: &BotContext,
    language_code: Option<&str>,
) -> Result<()> {
    bot.send_message(msg.chat.id, t_lang(&ctx.localization, "ping-reply", language_code))
        .await?;
    Ok(())
}

/// Handle the /test_seller command
pub async fn handle_test_seller_command(
    bot: &Bot,
    msg: &Message,
    ctx: &BotContext,
    language_code: Option<&str>,
) -> Result<()> {
    let user_id = msg.from.as_ref().map(|u| u.id.0).unwrap_or_default();
    let reply = check_seller_delivery(bot, ctx, user_id, language_code).await;
    bot.send_message(msg.chat.id, escape(&reply))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Send a test message to the configured seller chat and return the text
/// to show the requesting user
pub async fn check_seller_delivery<S>(
    sender: &S,
    ctx: &BotContext,
    user_id: u64,
    language_code: Option<&str>,
) -> String
where
    S: MessageSender + ?Sized,
{
    let Some(seller) = ctx.config.delivery.seller_chat_id else {
        debug!(user_id, "Seller check requested without SELLER_CHAT_ID");
        return t_lang(&ctx.localization, "test-seller-missing", language_code);
    };

    let user_id_text = user_id.to_string();
    let probe = t_args_lang(
        &ctx.localization,
        "test-seller-message",
        &[("user_id", user_id_text.as_str())],
        language_code,
    );

    match sender.send_html(ChatId(seller), &escape(&probe)).await {
        Ok(()) => {
            info!(user_id, seller_chat_id = seller, "Seller check message delivered");
            t_lang(&ctx.localization, "test-seller-sent", language_code)
        }
        Err(e) => {
            log_delivery_error(&e, "seller", seller, 0);
            let error = e.to_string();
            t_args_lang(
                &ctx.localization,
                "test-seller-failed",
                &[("error", error.as_str())],
                language_code,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("/start"), Some(Command::Start));
        assert_eq!(parse_command("/start@CatalogBot payload"), Some(Command::Start));
        assert_eq!(parse_command("/HELP"), Some(Command::Help));
        assert_eq!(parse_command("/ping"), Some(Command::Ping));
        assert_eq!(parse_command("/test_seller"), Some(Command::TestSeller));
        assert_eq!(parse_command("/unknown"), None);
        assert_eq!(parse_command("start"), None);
        assert_eq!(parse_command(""), None);
    }
}
