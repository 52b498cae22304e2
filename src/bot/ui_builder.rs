//! UI Builder module for creating keyboards and formatting messages

use reqwest::Url;
use teloxide::types::{ButtonRequest, KeyboardButton, KeyboardMarkup, WebAppInfo};

use crate::localization::{t_lang, LocalizationManager};

/// Reply keyboard with a single button that opens the catalog web app.
///
/// Only web apps launched from a reply keyboard may send data back to the
/// bot, so an inline button would never produce an order.
pub fn create_catalog_keyboard(url: &Url, label: &str) -> KeyboardMarkup {
    let button = KeyboardButton::new(label).request(ButtonRequest::WebApp(WebAppInfo {
        url: url.clone(),
    }));
    KeyboardMarkup::new(vec![vec![button]]).resize_keyboard()
}

/// Greeting sent for `/start`
pub fn format_welcome_message(
    localization: &LocalizationManager,
    language_code: Option<&str>,
) -> String {
    format!(
        "👋 {}\n\n{}",
        t_lang(localization, "welcome-title", language_code),
        t_lang(localization, "welcome-description", language_code)
    )
}

/// Help text sent for `/help`
pub fn format_help_message(localization: &LocalizationManager, language_code: Option<&str>) -> String {
    [
        t_lang(localization, "help-title", language_code),
        t_lang(localization, "help-description", language_code),
        t_lang(localization, "help-commands", language_code),
    ]
    .join("\n\n")
}
