use anyhow::Result;
use catalog_order_bot::bot::{self, BotContext};
use catalog_order_bot::config::AppConfig;
use catalog_order_bot::localization;
use catalog_order_bot::observability::{self, HealthState};
use catalog_order_bot::observability_config::ObservabilityConfig;
use catalog_order_bot::supervisor::{self, PollingErrorHandler};
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    // Logging comes up before the configuration so its errors are recorded
    observability::init_logging(&ObservabilityConfig::from_env())?;

    let config = Arc::new(AppConfig::load()?);

    // Readiness flips once the token has been verified against Telegram
    let health = HealthState::new();
    observability::start_metrics_export(
        &config.observability,
        config.server.metrics_port,
        Arc::clone(&health),
    )
    .await?;

    info!("{}", config.summary());

    // Initialize localization manager
    let localization_manager = localization::create_localization_manager()?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.bot.http_timeout_secs))
        .build()?;
    let bot = Bot::with_client(config.bot.token.clone(), client);

    supervisor::prepare_bot(&bot, &config.supervisor).await?;
    health.mark_ready();

    info!(
        http_timeout_secs = config.bot.http_timeout_secs,
        "Bot initialized, starting long polling"
    );

    let context = BotContext::new(Arc::clone(&config), localization_manager);

    let handler = dptree::entry().branch(Update::filter_message().endpoint({
        let context = Arc::clone(&context);
        move |bot: Bot, msg: Message| {
            let context = Arc::clone(&context);
            async move { bot::message_handler(bot, msg, context).await }
        }
    }));

    let listener = supervisor::polling_listener(bot.clone(), &config.supervisor);
    let error_handler = PollingErrorHandler::new(config.supervisor.clone());

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(listener, error_handler)
        .await;

    Ok(())
}
