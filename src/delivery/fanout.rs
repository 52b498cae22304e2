//! Sequential fan-out of one rendered receipt to an ordered list of targets.
//!
//! Every target gets exactly one send attempt. A failure is recorded and
//! logged, then delivery moves on; nothing short-circuits and nothing is
//! rolled back.

use std::time::Instant;

use teloxide::types::ChatId;
use tracing::{debug, info, Instrument};

use super::render::{render_receipt, ReceiptLabels};
use super::sender::MessageSender;
use super::targets::DeliveryTarget;
use crate::errors::error_logging::log_delivery_error;
use crate::errors::AppError;
use crate::observability;
use crate::order::CanonicalOrder;

/// Result of the send attempt to one target
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    pub target: DeliveryTarget,
    pub success: bool,
    /// Tagged failure text (`[DELIVERY] ...` or `[NETWORK] ...`)
    pub error: Option<String>,
}

/// All outcomes of one fan-out, in target order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeliveryReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

/// What the buyer should be told about their order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// Every recipient was reached
    Confirmed,
    /// Every recipient was reached and the buyer already got the receipt as
    /// the seller destination; no extra confirmation
    Suppressed,
    /// At least one recipient was not reached
    Degraded { attempted: usize, failed: usize },
}

impl DeliveryReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    /// Decide the buyer-facing acknowledgement. Failed targets are never named.
    pub fn acknowledgement(&self, buyer_chat: ChatId) -> Acknowledgement {
        if !self.all_succeeded() {
            return Acknowledgement::Degraded {
                attempted: self.attempted(),
                failed: self.failed(),
            };
        }

        let buyer_is_seller = self
            .outcomes
            .iter()
            .any(|o| matches!(o.target, DeliveryTarget::Seller(chat) if chat == buyer_chat));

        if buyer_is_seller {
            Acknowledgement::Suppressed
        } else {
            Acknowledgement::Confirmed
        }
    }
}

/// Render `order` once and deliver it to every target in order
pub async fn deliver<S>(
    sender: &S,
    order: &CanonicalOrder,
    targets: &[DeliveryTarget],
    labels: &ReceiptLabels,
) -> DeliveryReport
where
    S: MessageSender + ?Sized,
{
    let message = render_receipt(order, labels);
    let span = observability::delivery_span(targets.len(), order.items.len());

    async {
        let report = send_to_targets(sender, &message, targets, order.items.len()).await;

        observability::record_fanout_outcome(report.attempted(), report.failed());
        info!(
            attempted = report.attempted(),
            failed = report.failed(),
            effective_total = order.effective_total(),
            "Order fan-out finished"
        );

        report
    }
    .instrument(span)
    .await
}

/// Send an already rendered message to each target, sequentially
pub async fn send_to_targets<S>(
    sender: &S,
    message: &str,
    targets: &[DeliveryTarget],
    item_count: usize,
) -> DeliveryReport
where
    S: MessageSender + ?Sized,
{
    let mut report = DeliveryReport {
        outcomes: Vec::with_capacity(targets.len()),
    };

    for target in targets {
        let started = Instant::now();
        let result = sender.send_html(target.chat_id(), message).await;
        observability::record_delivery_attempt(target.kind(), result.is_ok(), started.elapsed());

        let outcome = match result {
            Ok(()) => {
                debug!(target = %target, "Order delivered to target");
                DeliveryOutcome {
                    target: *target,
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                let error = AppError::from(e);
                log_delivery_error(&error, target.kind(), target.chat_id().0, item_count);
                DeliveryOutcome {
                    target: *target,
                    success: false,
                    error: Some(error.to_string()),
                }
            }
        };
        report.outcomes.push(outcome);
    }

    report
}
