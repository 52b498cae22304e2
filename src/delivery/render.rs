//! Receipt rendering for Telegram's HTML parse mode.
//!
//! The canonical order holds raw text; every payload-derived string is escaped
//! here, so markup characters in titles, names or comments can never change the
//! structure of the message.
//!
//! Telegram refuses messages over [`MAX_MESSAGE_CHARS`]. Free text is capped
//! per field and item lines are listed only while they fit, followed by a
//! count of the ones left out.

use teloxide::utils::html::escape;

use crate::localization::LocalizationManager;
use crate::order::{BuyerIdentity, CanonicalOrder, LineItem};

/// Telegram's limit for one text message
pub const MAX_MESSAGE_CHARS: usize = 4096;

// Caps on escaped payload text
const MAX_ITEM_TITLE_CHARS: usize = 300;
const MAX_NAME_CHARS: usize = 150;
const MAX_HANDLE_CHARS: usize = 64;
const MAX_COMMENT_CHARS: usize = 1500;

/// Localized fixed strings of a receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLabels {
    pub title: String,
    pub buyer: String,
    pub items_empty: String,
    pub item_untitled: String,
    /// Follows the count of item lines left out of a long receipt
    pub items_more: String,
    pub total: String,
    pub comment: String,
    pub comment_empty: String,
}

impl Default for ReceiptLabels {
    fn default() -> Self {
        Self {
            title: "🧾 New order".to_string(),
            buyer: "Buyer".to_string(),
            items_empty: "(no items)".to_string(),
            item_untitled: "(untitled)".to_string(),
            items_more: "more items".to_string(),
            total: "Total".to_string(),
            comment: "Comment".to_string(),
            comment_empty: "—".to_string(),
        }
    }
}

impl ReceiptLabels {
    /// Load the labels for `language` from the localization bundles
    pub fn from_localization(localization: &LocalizationManager, language: &str) -> Self {
        let get = |key: &str| localization.get_message_in_language(key, language, None);
        Self {
            title: get("order-title"),
            buyer: get("order-buyer"),
            items_empty: get("order-items-empty"),
            item_untitled: get("order-item-untitled"),
            items_more: get("order-items-more"),
            total: get("order-total"),
            comment: get("order-comment"),
            comment_empty: get("order-comment-empty"),
        }
    }
}

/// Render the full receipt message, never longer than [`MAX_MESSAGE_CHARS`]
pub fn render_receipt(order: &CanonicalOrder, labels: &ReceiptLabels) -> String {
    let header = [
        format!("<b>{}</b>", escape(&labels.title)),
        format!("{}: {}", escape(&labels.buyer), render_buyer(&order.buyer)),
        String::new(),
    ];

    let comment = match &order.comment {
        Some(comment) => escape_truncated(comment, MAX_COMMENT_CHARS),
        None => escape(&labels.comment_empty),
    };
    let footer = [
        String::new(),
        format!("<b>{}: {}</b>", escape(&labels.total), order.effective_total()),
        format!("{}: {}", escape(&labels.comment), comment),
    ];

    let fixed: usize = header.iter().chain(&footer).map(|line| line_cost(line)).sum();
    let body = if order.items.is_empty() {
        vec![escape(&labels.items_empty)]
    } else {
        fit_items(&order.items, labels, MAX_MESSAGE_CHARS.saturating_sub(fixed))
    };

    header
        .into_iter()
        .chain(body)
        .chain(footer)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Item lines that fit in `budget` chars, plus a `… +N more` line when some don't
fn fit_items(items: &[LineItem], labels: &ReceiptLabels, budget: usize) -> Vec<String> {
    let more_cost = line_cost(&more_line(items.len(), labels));
    let mut lines = Vec::new();
    let mut used = 0;

    for (index, item) in items.iter().enumerate() {
        let line = render_item(item, labels);
        let cost = line_cost(&line);
        let is_last = index + 1 == items.len();
        let needed = if is_last { cost } else { cost + more_cost };
        if used + needed > budget {
            break;
        }
        used += cost;
        lines.push(line);
    }

    let hidden = items.len() - lines.len();
    if hidden > 0 {
        lines.push(more_line(hidden, labels));
    }
    lines
}

fn more_line(hidden: usize, labels: &ReceiptLabels) -> String {
    format!("… +{} {}", hidden, escape(&labels.items_more))
}

/// Chars a line takes in the joined message, newline included
fn line_cost(line: &str) -> usize {
    line.chars().count() + 1
}

/// Escape `text`, cutting it so the escaped form has at most `max` chars.
/// A cut is marked with `…` and never splits an entity.
pub fn escape_truncated(text: &str, max: usize) -> String {
    let escaped = escape(text);
    if escaped.chars().count() <= max {
        return escaped;
    }

    let limit = max.saturating_sub(1);
    let mut out = String::new();
    let mut used = 0;
    let mut buf = [0u8; 4];
    for c in text.chars() {
        let piece = escape(c.encode_utf8(&mut buf));
        let len = piece.chars().count();
        if used + len > limit {
            break;
        }
        out.push_str(&piece);
        used += len;
    }
    out.push('…');
    out
}

/// `Name @username (id 42)`, each part escaped
pub fn render_buyer(buyer: &BuyerIdentity) -> String {
    let mut rendered = escape_truncated(&buyer.display_name, MAX_NAME_CHARS);

    if let Some(username) = &buyer.username {
        rendered.push_str(&format!(" @{}", escape_truncated(username, MAX_HANDLE_CHARS)));
    }
    if let Some(id) = &buyer.external_id {
        rendered.push_str(&format!(" (id {})", escape_truncated(id, MAX_HANDLE_CHARS)));
    }

    rendered
}

/// `• {title} — {quantity} × {unit_price} = {subtotal}`
pub fn render_item(item: &LineItem, labels: &ReceiptLabels) -> String {
    let title = if item.title.trim().is_empty() {
        escape(&labels.item_untitled)
    } else {
        escape_truncated(&item.title, MAX_ITEM_TITLE_CHARS)
    };

    format!(
        "• {} — {} × {} = {}",
        title, item.quantity, item.unit_price, item.subtotal
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_item_line() {
        let item = LineItem::new("Tea", 2, 150);
        assert_eq!(
            render_item(&item, &ReceiptLabels::default()),
            "• Tea — 2 × 150 = 300"
        );
    }

    #[test]
    fn test_render_item_untitled() {
        let item = LineItem::new("  ", 1, 10);
        assert_eq!(
            render_item(&item, &ReceiptLabels::default()),
            "• (untitled) — 1 × 10 = 10"
        );
    }

    #[test]
    fn test_render_buyer_parts() {
        let buyer = BuyerIdentity {
            display_name: "Jo <3".to_string(),
            username: Some("jo".to_string()),
            external_id: Some("9".to_string()),
        };
        assert_eq!(render_buyer(&buyer), "Jo &lt;3 @jo (id 9)");

        let anonymous = BuyerIdentity {
            display_name: "Jo".to_string(),
            ..Default::default()
        };
        assert_eq!(render_buyer(&anonymous), "Jo");
    }

    #[test]
    fn test_comment_placeholder() {
        let order = CanonicalOrder::default();
        let rendered = render_receipt(&order, &ReceiptLabels::default());
        assert!(rendered.ends_with("Comment: —"));
        assert!(rendered.contains("(no items)"));
        assert!(rendered.contains("<b>Total: 0</b>"));
    }

    #[test]
    fn test_escape_truncated_keeps_entities_whole() {
        assert_eq!(escape_truncated("short", 10), "short");
        assert_eq!(escape_truncated("abcdef", 4), "abc…");
        // "&amp;" does not fit after "a", so the cut happens before it
        assert_eq!(escape_truncated("a&b", 5), "a…");
        assert_eq!(escape_truncated("чай с мятой", 4), "чай…");
    }

    #[test]
    fn test_long_title_is_cut() {
        let item = LineItem::new(&"x".repeat(5000), 1, 10);
        let line = render_item(&item, &ReceiptLabels::default());
        assert!(line.contains('…'));
        assert!(line.chars().count() < 400);
    }

    #[test]
    fn test_huge_cart_fits_one_message() {
        let order = CanonicalOrder {
            items: (0..500)
                .map(|i| LineItem::new(&format!("Item <{}> {}", i, "y".repeat(80)), 2, 999))
                .collect(),
            comment: Some("&".repeat(3000)),
            computed_total: 999_000,
            ..Default::default()
        };
        let rendered = render_receipt(&order, &ReceiptLabels::default());

        assert!(rendered.chars().count() <= MAX_MESSAGE_CHARS);
        assert!(rendered.contains("more items"));
        assert!(rendered.contains("<b>Total: 999000</b>"));
        assert!(rendered.contains("Item &lt;0&gt;"));
        assert!(!rendered.contains("Item &lt;499&gt;"));
    }

    #[test]
    fn test_cart_that_fits_has_no_more_line() {
        let order = CanonicalOrder {
            items: vec![LineItem::new("Tea", 1, 5), LineItem::new("Cake", 2, 7)],
            ..Default::default()
        };
        let rendered = render_receipt(&order, &ReceiptLabels::default());
        assert!(!rendered.contains("more items"));
        assert!(rendered.contains("• Cake — 2 × 7 = 14"));
    }
}
