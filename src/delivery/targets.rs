//! Destination resolution for order fan-out.

use std::fmt;
use std::str::FromStr;

use teloxide::types::ChatId;

use crate::config::DeliveryConfig;

/// One destination of an order receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryTarget {
    /// The seller chat, or the buyer when no seller is configured
    Seller(ChatId),
    /// A copy of the receipt for the buyer
    BuyerCopy(ChatId),
    /// Operations log chat
    AuditLog(ChatId),
}

impl DeliveryTarget {
    pub fn chat_id(&self) -> ChatId {
        match self {
            DeliveryTarget::Seller(id) | DeliveryTarget::BuyerCopy(id) | DeliveryTarget::AuditLog(id) => *id,
        }
    }

    /// Short label used in logs and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            DeliveryTarget::Seller(_) => "seller",
            DeliveryTarget::BuyerCopy(_) => "buyer_copy",
            DeliveryTarget::AuditLog(_) => "audit_log",
        }
    }
}

impl fmt::Display for DeliveryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.chat_id())
    }
}

/// What to do with the buyer copy when the buyer chat is also the seller chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuyerCopyPolicy {
    /// Send the copy anyway; the chat receives the receipt twice
    Always,
    /// Skip the copy, the seller message already reached the buyer
    #[default]
    SkipWhenSeller,
}

impl FromStr for BuyerCopyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "always" => Ok(BuyerCopyPolicy::Always),
            "skip_when_seller" | "skip" => Ok(BuyerCopyPolicy::SkipWhenSeller),
            other => Err(format!(
                "Unknown buyer copy policy '{}', expected 'always' or 'skip_when_seller'",
                other
            )),
        }
    }
}

/// Build the ordered destination list for an order placed from `buyer_chat`.
///
/// Order is always seller, buyer copy, audit log. Without a configured seller
/// the buyer's own chat stands in as the seller destination and no separate
/// buyer copy is sent.
pub fn resolve_targets(config: &DeliveryConfig, buyer_chat: ChatId) -> Vec<DeliveryTarget> {
    let mut targets = Vec::with_capacity(3);

    let seller_chat = config.seller_chat_id.map(ChatId);
    match seller_chat {
        Some(seller) => {
            targets.push(DeliveryTarget::Seller(seller));

            let buyer_is_seller = seller == buyer_chat;
            let skip_copy =
                buyer_is_seller && config.buyer_copy_policy == BuyerCopyPolicy::SkipWhenSeller;
            if config.send_buyer_copy && !skip_copy {
                targets.push(DeliveryTarget::BuyerCopy(buyer_chat));
            }
        }
        None => targets.push(DeliveryTarget::Seller(buyer_chat)),
    }

    if let Some(log_chat) = config.log_chat_id {
        targets.push(DeliveryTarget::AuditLog(ChatId(log_chat)));
    }

    targets
}
