//! # Application Error Types
//!
//! This module defines common error types used throughout the catalog order bot.
//! It provides structured error handling for the order pipeline and its plumbing.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// The app-data payload could not be parsed as a JSON object
    InvalidPayload(String),
    /// An outbound send to one destination failed
    Delivery(String),
    /// Network/communication errors
    Network(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::InvalidPayload(msg) => write!(f, "[PAYLOAD] {}", msg),
            AppError::Delivery(msg) => write!(f, "[DELIVERY] {}", msg),
            AppError::Network(msg) => write!(f, "[NETWORK] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<crate::order::PayloadError> for AppError {
    fn from(err: crate::order::PayloadError) -> Self {
        AppError::InvalidPayload(err.to_string())
    }
}

impl From<crate::delivery::DeliveryError> for AppError {
    fn from(err: crate::delivery::DeliveryError) -> Self {
        match err {
            crate::delivery::DeliveryError::Network(msg) => AppError::Network(msg),
            other => AppError::Delivery(other.to_string()),
        }
    }
}

impl From<teloxide::RequestError> for AppError {
    fn from(err: teloxide::RequestError) -> Self {
        match err {
            teloxide::RequestError::Network(e) => AppError::Network(e.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the application
pub mod error_logging {
    use tracing::{error, warn};

    /// Log a payload that could not be turned into an order
    pub fn log_payload_error(
        error: &impl std::fmt::Display,
        user_id: Option<u64>,
        payload_len: usize,
        source: &str,
    ) {
        warn!(
            error = %error,
            user_id = ?user_id,
            payload_len = %payload_len,
            source = %source,
            "Order payload rejected"
        );
    }

    /// Log a failed send to a single fan-out destination
    pub fn log_delivery_error(
        error: &impl std::fmt::Display,
        target_kind: &str,
        chat_id: i64,
        item_count: usize,
    ) {
        error!(
            error = %error,
            target = %target_kind,
            chat_id = %chat_id,
            item_count = %item_count,
            "Order delivery to target failed"
        );
    }

    /// Log network/communication errors with connection context
    pub fn log_network_error(
        error: &impl std::fmt::Display,
        operation: &str,
        endpoint: Option<&str>,
        attempt_count: Option<u32>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            endpoint = ?endpoint,
            attempt_count = ?attempt_count,
            "Network operation failed"
        );
    }

    /// Log internal application errors with component context
    pub fn log_internal_error(
        error: &impl std::fmt::Display,
        component: &str,
        operation: &str,
        user_id: Option<u64>,
    ) {
        error!(
            error = %error,
            component = %component,
            operation = %operation,
            user_id = ?user_id,
            "Internal application error"
        );
    }

    /// Log configuration errors during startup/initialization
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_tags() {
        assert_eq!(
            AppError::Config("missing token".to_string()).to_string(),
            "[CONFIG] missing token"
        );
        assert_eq!(
            AppError::InvalidPayload("not an object".to_string()).to_string(),
            "[PAYLOAD] not an object"
        );
        assert_eq!(
            AppError::Delivery("chat not found".to_string()).to_string(),
            "[DELIVERY] chat not found"
        );
    }

    #[test]
    fn test_network_delivery_error_maps_to_network() {
        let err: AppError = crate::delivery::DeliveryError::Network("timeout".to_string()).into();
        assert_eq!(err, AppError::Network("timeout".to_string()));

        let err: AppError = crate::delivery::DeliveryError::Api("blocked".to_string()).into();
        assert!(matches!(err, AppError::Delivery(_)));
    }
}
