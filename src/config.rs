//! # Unified Application Configuration
//!
//! This module consolidates all application settings into a single, structured
//! configuration object. It is built once at process start from environment
//! variables (a `.env` file is loaded by `main` through dotenvy), validated,
//! and then shared read-only with the handlers.

use crate::delivery::BuyerCopyPolicy;
use crate::errors::error_logging::log_config_error;
use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use crate::supervisor::BackoffConfig;
use reqwest::Url;
use std::env;
use std::str::FromStr;

/// Environment variables accepted for the bot token, in priority order
pub const TOKEN_VARS: &[&str] = &["TELEGRAM_BOT_TOKEN", "BOT_TOKEN", "TOKEN"];

/// Bot-specific configuration settings
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot token
    pub token: String,
    /// HTTP client timeout in seconds
    pub http_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            http_timeout_secs: 30,
        }
    }
}

impl BotConfig {
    /// Validate bot configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.token.trim().is_empty() {
            return Err(AppError::Config("Bot token cannot be empty".to_string()));
        }

        let parts: Vec<&str> = self.token.split(':').collect();
        if parts.len() != 2 {
            return Err(AppError::Config(
                "Bot token format is invalid. Expected format: 'bot_id:bot_token'".to_string(),
            ));
        }

        if parts[0].parse::<u64>().is_err() {
            return Err(AppError::Config("Bot token bot ID must be numeric".to_string()));
        }

        if parts[1].len() < 20 {
            return Err(AppError::Config(
                "Bot token appears to be too short. Please verify it's a valid token".to_string(),
            ));
        }

        if self.http_timeout_secs == 0 {
            return Err(AppError::Config("HTTP timeout cannot be 0".to_string()));
        }

        // Long polling holds the request open for 30s
        if self.http_timeout_secs > 300 {
            return Err(AppError::Config(
                "HTTP timeout cannot be greater than 300 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

/// The hosted catalog opened from the greeting button
#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    /// Web app URL; Telegram only opens https pages
    pub web_app_url: String,
}

impl CatalogConfig {
    /// Parsed catalog URL
    pub fn url(&self) -> AppResult<Url> {
        Url::parse(self.web_app_url.trim())
            .map_err(|e| AppError::Config(format!("WEBAPP_URL is not a valid URL: {}", e)))
    }

    /// Validate catalog configuration
    pub fn validate(&self) -> AppResult<()> {
        let url = self.url()?;
        if url.scheme() != "https" {
            return Err(AppError::Config(
                "WEBAPP_URL must use https, Telegram refuses other schemes".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where order receipts go
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Seller chat; when absent the buyer's own chat receives the receipt
    pub seller_chat_id: Option<i64>,
    /// Optional operations log chat
    pub log_chat_id: Option<i64>,
    /// Whether the buyer gets a copy of the receipt
    pub send_buyer_copy: bool,
    /// Buyer copy behavior when the buyer chat is the seller chat
    pub buyer_copy_policy: BuyerCopyPolicy,
    /// Language of the receipt sent to seller and log chats
    pub receipt_language: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            seller_chat_id: None,
            log_chat_id: None,
            send_buyer_copy: true,
            buyer_copy_policy: BuyerCopyPolicy::default(),
            receipt_language: "en".to_string(),
        }
    }
}

impl DeliveryConfig {
    /// Validate delivery configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.seller_chat_id == Some(0) {
            return Err(AppError::Config("SELLER_CHAT_ID cannot be 0".to_string()));
        }
        if self.log_chat_id == Some(0) {
            return Err(AppError::Config("LOG_CHAT_ID cannot be 0".to_string()));
        }
        if self.receipt_language.trim().is_empty() {
            return Err(AppError::Config(
                "RECEIPT_LANGUAGE cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Server configuration for health checks and metrics
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Metrics and health server port
    pub metrics_port: u16,
    /// Whether to allow privileged ports (< 1024)
    pub allow_privileged_ports: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            metrics_port: 9090,
            allow_privileged_ports: false,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.metrics_port == 0 {
            return Err(AppError::Config("Metrics port cannot be 0".to_string()));
        }

        if self.metrics_port < 1024 && !self.allow_privileged_ports {
            return Err(AppError::Config(format!(
                "METRICS_PORT {} is a privileged port (< 1024). Set ALLOW_PRIVILEGED_PORTS=true to allow or use a port >= 1024",
                self.metrics_port
            )));
        }

        Ok(())
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub catalog: CatalogConfig,
    pub delivery: DeliveryConfig,
    pub server: ServerConfig,
    pub supervisor: BackoffConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.bot.token = TOKEN_VARS
            .iter()
            .find_map(|key| non_empty(&lookup, key))
            .ok_or_else(|| {
                AppError::Config(
                    "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
                )
            })?;
        config.bot.http_timeout_secs = parse_or(&lookup, "HTTP_CLIENT_TIMEOUT_SECS", 30)?;

        config.catalog.web_app_url = non_empty(&lookup, "WEBAPP_URL").ok_or_else(|| {
            AppError::Config("WEBAPP_URL environment variable is required".to_string())
        })?;

        config.delivery.seller_chat_id = parse_optional(&lookup, "SELLER_CHAT_ID")?;
        config.delivery.log_chat_id = parse_optional(&lookup, "LOG_CHAT_ID")?;
        config.delivery.send_buyer_copy = parse_bool(&lookup, "SEND_BUYER_COPY", true);
        config.delivery.buyer_copy_policy =
            parse_or(&lookup, "BUYER_COPY_POLICY", BuyerCopyPolicy::default())?;
        config.delivery.receipt_language =
            non_empty(&lookup, "RECEIPT_LANGUAGE").unwrap_or_else(|| "en".to_string());

        config.server.metrics_port = parse_or(&lookup, "METRICS_PORT", 9090)?;
        config.server.allow_privileged_ports = parse_bool(&lookup, "ALLOW_PRIVILEGED_PORTS", false);

        config.supervisor.base_delay_ms = parse_or(&lookup, "POLL_BASE_DELAY_MS", 1000)?;
        config.supervisor.max_delay_ms = parse_or(&lookup, "POLL_MAX_DELAY_MS", 60_000)?;

        config.observability = ObservabilityConfig::from_lookup(&lookup);

        Ok(config)
    }

    /// Load from the environment and validate, logging the stage that failed
    pub fn load() -> AppResult<Self> {
        Self::load_with(|key| env::var(key).ok())
    }

    /// [`AppConfig::load`] through an arbitrary variable lookup
    pub fn load_with<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::from_lookup(lookup).inspect_err(|e| {
            log_config_error(e, "environment", "load_configuration");
        })?;
        config.validate().inspect_err(|e| {
            log_config_error(e, "environment", "validate_configuration");
        })?;
        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.bot.validate()?;
        self.catalog.validate()?;
        self.delivery.validate()?;
        self.server.validate()?;
        self.supervisor.validate()?;
        self.observability
            .validate()
            .map_err(|e| AppError::Config(format!("Invalid observability configuration: {}", e)))?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: bot_token=[REDACTED], webapp_url={}, seller_configured={}, log_chat_configured={}, buyer_copy={}, buyer_copy_policy={:?}, metrics_port={}",
            self.catalog.web_app_url,
            self.delivery.seller_chat_id.is_some(),
            self.delivery.log_chat_id.is_some(),
            self.delivery.send_buyer_copy,
            self.delivery.buyer_copy_policy,
            self.server.metrics_port,
        )
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: '{}'", key, raw))),
        None => Ok(default),
    }
}

fn parse_optional<F, T>(lookup: &F, key: &str) -> AppResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    non_empty(lookup, key)
        .map(|raw| {
            raw.parse()
                .map_err(|_| AppError::Config(format!("{} has an invalid value: '{}'", key, raw)))
        })
        .transpose()
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key).map(|v| v.to_lowercase()) {
        Some(v) => matches!(v.as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const VALID_TOKEN: &str = "123456789:AAFakeTokenForTestingPurposes1234567890";

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_bot_config_validation() {
        let mut config = BotConfig::default();

        // Invalid: empty token
        assert!(config.validate().is_err());

        // Invalid: malformed token
        config.token = "invalid-token".to_string();
        assert!(config.validate().is_err());

        // Invalid: short token
        config.token = "123:short".to_string();
        assert!(config.validate().is_err());

        config.token = VALID_TOKEN.to_string();
        assert!(config.validate().is_ok());

        // Invalid: zero timeout
        config.http_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_catalog_requires_https() {
        let mut config = CatalogConfig {
            web_app_url: "http://shop.example.com".to_string(),
        };
        assert!(config.validate().is_err());

        config.web_app_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.web_app_url = "https://shop.example.com/catalog".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_config_validation() {
        let mut config = ServerConfig::default();
        assert!(config.validate().is_ok());

        config.metrics_port = 80;
        assert!(config.validate().is_err());

        config.allow_privileged_ports = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_minimal() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("BOT_TOKEN", VALID_TOKEN),
            ("WEBAPP_URL", "https://shop.example.com"),
        ]))
        .unwrap();

        assert_eq!(config.bot.token, VALID_TOKEN);
        assert_eq!(config.delivery.seller_chat_id, None);
        assert!(config.delivery.send_buyer_copy);
        assert_eq!(config.delivery.buyer_copy_policy, BuyerCopyPolicy::SkipWhenSeller);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_token_priority() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("TOKEN", "1:legacy"),
            ("TELEGRAM_BOT_TOKEN", VALID_TOKEN),
            ("WEBAPP_URL", "https://shop.example.com"),
        ]))
        .unwrap();
        assert_eq!(config.bot.token, VALID_TOKEN);
    }

    #[test]
    fn test_from_lookup_delivery_settings() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", VALID_TOKEN),
            ("WEBAPP_URL", "https://shop.example.com"),
            ("SELLER_CHAT_ID", "-1001234567890"),
            ("LOG_CHAT_ID", "555"),
            ("SEND_BUYER_COPY", "false"),
            ("BUYER_COPY_POLICY", "always"),
        ]))
        .unwrap();

        assert_eq!(config.delivery.seller_chat_id, Some(-1001234567890));
        assert_eq!(config.delivery.log_chat_id, Some(555));
        assert!(!config.delivery.send_buyer_copy);
        assert_eq!(config.delivery.buyer_copy_policy, BuyerCopyPolicy::Always);
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let missing_token = AppConfig::from_lookup(lookup_from(&[(
            "WEBAPP_URL",
            "https://shop.example.com",
        )]));
        assert!(matches!(missing_token, Err(AppError::Config(_))));

        let bad_chat = AppConfig::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", VALID_TOKEN),
            ("WEBAPP_URL", "https://shop.example.com"),
            ("SELLER_CHAT_ID", "@my_shop"),
        ]));
        assert!(matches!(bad_chat, Err(AppError::Config(_))));
    }

    #[test]
    fn test_summary_redacts_token() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", VALID_TOKEN),
            ("WEBAPP_URL", "https://shop.example.com"),
        ]))
        .unwrap();
        assert!(!config.summary().contains(VALID_TOKEN));
        assert!(config.summary().contains("[REDACTED]"));
    }
}
