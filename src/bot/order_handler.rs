//! Order pipeline: app data in, receipt fan-out, buyer acknowledgement out.
//!
//! Everything goes through [`MessageSender`], so the whole flow runs against
//! a recording sender in tests.

use teloxide::types::ChatId;
use teloxide::utils::html::escape;
use tracing::{info, warn, Instrument};

use super::BotContext;
use crate::delivery::{deliver, resolve_targets, Acknowledgement, DeliveryReport, MessageSender};
use crate::errors::error_logging::{log_internal_error, log_payload_error};
use crate::errors::AppError;
use crate::localization::t_lang;
use crate::observability;
use crate::order::normalize_str;

/// How the payload reached the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSource {
    /// Telegram `web_app_data` service message
    WebApp,
    /// JSON object pasted into an ordinary text message
    Text,
}

impl OrderSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSource::WebApp => "web_app",
            OrderSource::Text => "text",
        }
    }
}

/// One incoming order payload with its sender context
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Chat the payload came from; acknowledgements go here
    pub buyer_chat: ChatId,
    /// Sender's platform name, used when the payload has no buyer name
    pub sender_name: String,
    pub user_id: Option<u64>,
    pub language_code: Option<String>,
    pub data: String,
    pub source: OrderSource,
}

/// What happened to an order request
#[derive(Debug, Clone, PartialEq)]
pub enum OrderOutcome {
    /// The payload was not a JSON object; nothing was delivered
    Rejected(AppError),
    /// The receipt was fanned out
    Processed {
        report: DeliveryReport,
        acknowledgement: Acknowledgement,
    },
}

/// Normalize, deliver and acknowledge one order
pub async fn process_order<S>(sender: &S, ctx: &BotContext, request: OrderRequest) -> OrderOutcome
where
    S: MessageSender + ?Sized,
{
    let span = observability::order_span(request.source.as_str(), request.buyer_chat.0);
    run_order(sender, ctx, request).instrument(span).await
}

async fn run_order<S>(sender: &S, ctx: &BotContext, request: OrderRequest) -> OrderOutcome
where
    S: MessageSender + ?Sized,
{
    let language_code = request.language_code.as_deref();

    let order = match normalize_str(&request.data, &request.sender_name) {
        Ok(order) => order,
        Err(e) => {
            let error = AppError::from(e);
            observability::record_order_received(false, 0);
            log_payload_error(&error, request.user_id, request.data.len(), request.source.as_str());
            let text = t_lang(&ctx.localization, "order-invalid", language_code);
            reply(sender, request.buyer_chat, &text, request.user_id).await;
            return OrderOutcome::Rejected(error);
        }
    };

    observability::record_order_received(true, order.items.len());
    observability::record_order_total(order.effective_total());
    info!(
        user_id = ?request.user_id,
        item_count = order.items.len(),
        unit_count = order.unit_count(),
        declared_total = ?order.declared_total,
        computed_total = order.computed_total,
        "Order normalized"
    );

    let targets = resolve_targets(&ctx.config.delivery, request.buyer_chat);
    let report = deliver(sender, &order, &targets, &ctx.receipt_labels).await;
    let acknowledgement = report.acknowledgement(request.buyer_chat);

    let key = match acknowledgement {
        Acknowledgement::Confirmed => Some("order-confirmed"),
        Acknowledgement::Suppressed => None,
        Acknowledgement::Degraded { attempted, failed } => {
            warn!(attempted, failed, "Order reached only part of its recipients");
            Some("order-partial-failure")
        }
    };
    if let Some(key) = key {
        let text = t_lang(&ctx.localization, key, language_code);
        reply(sender, request.buyer_chat, &text, request.user_id).await;
    }

    OrderOutcome::Processed {
        report,
        acknowledgement,
    }
}

/// Best-effort reply to the buyer; a failure here changes nothing upstream
async fn reply<S>(sender: &S, chat_id: ChatId, text: &str, user_id: Option<u64>)
where
    S: MessageSender + ?Sized,
{
    if let Err(e) = sender.send_html(chat_id, &escape(text)).await {
        log_internal_error(&e, "order_handler", "acknowledge_buyer", user_id);
    }
}
