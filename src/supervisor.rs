//! # Polling Supervisor
//!
//! Keeps the long-polling transport alive. Startup calls are retried with
//! bounded exponential backoff, and the update listener's errors (most
//! notably `409 Conflict` when another instance is polling the same token)
//! are logged and slowed down with the same backoff.
//!
//! Nothing here touches the order pipeline; it only wraps the transport.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use teloxide::error_handlers::ErrorHandler;
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, BotCommand};
use teloxide::update_listeners::Polling;
use teloxide::{ApiError, RequestError};
use tracing::{error, info, warn};

use crate::errors::error_logging::log_network_error;
use crate::errors::{AppError, AppResult};
use crate::observability;

/// Backoff settings shared by startup retries and the polling error handler
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound of the exponential delay in milliseconds (jitter excluded)
    pub max_delay_ms: u64,
    /// Attempts for each startup call before giving up
    pub max_startup_attempts: u32,
    /// A listener error after this much quiet time restarts the backoff
    pub reset_after_secs: u64,
    /// Long polling timeout in seconds
    pub poll_timeout_secs: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 60_000,
            max_startup_attempts: 5,
            reset_after_secs: 120,
            poll_timeout_secs: 30,
        }
    }
}

impl BackoffConfig {
    /// Validate backoff configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.base_delay_ms == 0 {
            return Err(AppError::Config("POLL_BASE_DELAY_MS cannot be 0".to_string()));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(AppError::Config(
                "POLL_MAX_DELAY_MS cannot be lower than POLL_BASE_DELAY_MS".to_string(),
            ));
        }
        if self.max_startup_attempts == 0 {
            return Err(AppError::Config(
                "Startup attempts cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Calculate retry delay with exponential backoff
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay)
/// jitter = random(0, delay/4)
/// final_delay = delay + jitter
/// ```
///
/// `attempt` is 1-based; 0 is treated as 1.
///
/// ```rust
/// use catalog_order_bot::supervisor::{calculate_retry_delay, BackoffConfig};
///
/// let config = BackoffConfig::default();
/// let delay = calculate_retry_delay(2, &config);
/// assert!(delay >= 2000 && delay <= 2500);
/// ```
pub fn calculate_retry_delay(attempt: u32, config: &BackoffConfig) -> u64 {
    let exponent = attempt.saturating_sub(1).min(32);
    let delay = config
        .base_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(config.max_delay_ms);

    let jitter_range = delay / 4;
    let jitter = if jitter_range == 0 {
        0
    } else {
        rand::random::<u64>() % (jitter_range + 1)
    };
    delay + jitter
}

/// Run `operation` until it succeeds or `max_startup_attempts` is reached,
/// sleeping with backoff between attempts. The last error is returned.
pub async fn retry_with_backoff<T, E, F, Fut>(
    operation: &str,
    config: &BackoffConfig,
    mut call: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= config.max_startup_attempts => {
                log_network_error(&e, operation, Some("api.telegram.org"), Some(attempt));
                return Err(e);
            }
            Err(e) => {
                let delay = calculate_retry_delay(attempt, config);
                warn!(
                    operation = %operation,
                    attempt = attempt,
                    delay_ms = delay,
                    error = %e,
                    "Telegram call failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
                attempt += 1;
            }
        }
    }
}

/// Commands shown in the Telegram client menu
pub fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("start", "Open the catalog"),
        BotCommand::new("help", "How to order"),
        BotCommand::new("ping", "Check that the bot is alive"),
    ]
}

/// Bring the bot into a state where long polling can start.
///
/// Removes any webhook (dropping stale updates), verifies the token with
/// `getMe` and registers the command menu. Only a failing `getMe` is fatal.
pub async fn prepare_bot(bot: &Bot, config: &BackoffConfig) -> AppResult<()> {
    let webhook = retry_with_backoff("delete_webhook", config, || {
        let bot = bot.clone();
        async move { bot.delete_webhook().drop_pending_updates(true).await }
    })
    .await;
    match webhook {
        Ok(_) => info!("Webhook removed, pending updates dropped"),
        Err(e) => warn!(error = %e, "Could not remove webhook, polling may conflict"),
    }

    let me = retry_with_backoff("get_me", config, || {
        let bot = bot.clone();
        async move { bot.get_me().await }
    })
    .await?;
    info!(
        bot_id = %me.id,
        username = %me.username(),
        name = %me.first_name,
        "Bot token verified"
    );

    if let Err(e) = bot.set_my_commands(bot_commands()).await {
        warn!(error = %e, "Could not register bot commands");
    }

    Ok(())
}

/// Long-polling listener restricted to the update kinds the bot handles
pub fn polling_listener(bot: Bot, config: &BackoffConfig) -> Polling<Bot> {
    Polling::builder(bot)
        .timeout(Duration::from_secs(u64::from(config.poll_timeout_secs)))
        .allowed_updates(vec![AllowedUpdate::Message])
        .build()
}

/// Is this the "terminated by other getUpdates request" conflict
pub fn is_polling_conflict(error: &RequestError) -> bool {
    matches!(error, RequestError::Api(ApiError::TerminatedByOtherGetUpdates))
}

/// Metric label for a listener error
pub fn transport_error_kind(error: &RequestError) -> &'static str {
    match error {
        e if is_polling_conflict(e) => "conflict",
        RequestError::Network(_) => "network",
        RequestError::Api(_) => "api",
        RequestError::RetryAfter(_) => "rate_limited",
        _ => "other",
    }
}

#[derive(Debug, Default)]
struct BackoffState {
    consecutive_failures: u32,
    last_failure: Option<Instant>,
}

/// Update listener error handler that logs and backs off
#[derive(Debug)]
pub struct PollingErrorHandler {
    config: BackoffConfig,
    state: Mutex<BackoffState>,
}

impl PollingErrorHandler {
    pub fn new(config: BackoffConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: Mutex::new(BackoffState::default()),
        })
    }

    /// Register one listener failure and return how long to wait
    pub fn register_failure(&self) -> Duration {
        let mut state = self.state.lock();

        let quiet = Duration::from_secs(self.config.reset_after_secs);
        if state.last_failure.is_some_and(|last| last.elapsed() > quiet) {
            state.consecutive_failures = 0;
        }

        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.last_failure = Some(Instant::now());

        Duration::from_millis(calculate_retry_delay(state.consecutive_failures, &self.config))
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.state.lock().consecutive_failures
    }
}

impl ErrorHandler<RequestError> for PollingErrorHandler {
    fn handle_error(
        self: Arc<Self>,
        error: RequestError,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let kind = transport_error_kind(&error);
            observability::record_transport_error(kind);
            let delay = self.register_failure();

            if is_polling_conflict(&error) {
                error!(
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Parallel getUpdates (409): another instance is polling with this token"
                );
            } else {
                error!(
                    error = %error,
                    kind = kind,
                    delay_ms = delay.as_millis() as u64,
                    "Update listener error, backing off"
                );
            }

            tokio::time::sleep(delay).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config() -> BackoffConfig {
        BackoffConfig {
            base_delay_ms: 1,
            max_delay_ms: 4,
            max_startup_attempts: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_retry_delay_progression() {
        let config = BackoffConfig::default();
        for (attempt, base) in [(1u32, 1000u64), (2, 2000), (3, 4000), (4, 8000)] {
            let delay = calculate_retry_delay(attempt, &config);
            assert!(delay >= base && delay <= base + base / 4, "attempt {attempt}: {delay}");
        }
    }

    #[test]
    fn test_retry_delay_is_capped() {
        let config = BackoffConfig::default();
        let delay = calculate_retry_delay(40, &config);
        assert!(delay >= 60_000 && delay <= 75_000);
    }

    #[test]
    fn test_retry_delay_tiny_base_has_no_jitter() {
        let config = BackoffConfig {
            base_delay_ms: 1,
            max_delay_ms: 3,
            ..Default::default()
        };
        assert_eq!(calculate_retry_delay(1, &config), 1);
        assert_eq!(calculate_retry_delay(0, &config), 1);
    }

    #[test]
    fn test_backoff_config_validation() {
        assert!(BackoffConfig::default().validate().is_ok());

        let config = BackoffConfig {
            max_delay_ms: 10,
            base_delay_ms: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_retry_with_backoff_recovers() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry_with_backoff("test", &fast_config(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(format!("failure {n}"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn test_retry_with_backoff_gives_up() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry_with_backoff("test", &fast_config(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("down".to_string()) }
        })
        .await;
        assert_eq!(result, Err("down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_polling_error_handler_grows_delay() {
        let handler = PollingErrorHandler::new(BackoffConfig::default());
        let first = handler.register_failure();
        let second = handler.register_failure();
        assert_eq!(handler.consecutive_failures(), 2);
        assert!(first <= Duration::from_millis(1250));
        assert!(second >= Duration::from_millis(2000));
    }

    #[test]
    fn test_conflict_detection() {
        let conflict = RequestError::Api(ApiError::TerminatedByOtherGetUpdates);
        assert!(is_polling_conflict(&conflict));
        assert_eq!(transport_error_kind(&conflict), "conflict");

        let other = RequestError::Api(ApiError::BotBlocked);
        assert!(!is_polling_conflict(&other));
        assert_eq!(transport_error_kind(&other), "api");
    }
}
