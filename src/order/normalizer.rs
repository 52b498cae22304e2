//! Order normalization: untrusted JSON in, [`CanonicalOrder`] out.
//!
//! The only hard failure is a payload that is not a JSON object. Every
//! field-level problem is resolved by substituting a documented default.

use serde_json::{Map, Value};
use tracing::debug;

use super::extract::{
    array_field, non_negative_int_field, object_field, optional_positive_int_field,
    optional_text_field, scalar_text, text_field,
};
use super::model::{BuyerIdentity, CanonicalOrder, LineItem};
use super::PayloadError;

/// Default quantity for items with a missing or invalid quantity
pub const DEFAULT_QUANTITY: u64 = 1;

/// Default unit price for items with a missing or invalid price
pub const DEFAULT_PRICE: u64 = 0;

/// Parse an app-data string into a JSON object value
pub fn parse_payload(data: &str) -> Result<Value, PayloadError> {
    let value: Value = serde_json::from_str(data.trim())
        .map_err(|e| PayloadError::Malformed(e.to_string()))?;

    if !value.is_object() {
        return Err(PayloadError::NotAnObject(json_kind(&value)));
    }

    Ok(value)
}

/// Parse and normalize an app-data string in one step
pub fn normalize_str(data: &str, fallback_display_name: &str) -> Result<CanonicalOrder, PayloadError> {
    let value = parse_payload(data)?;
    normalize(&value, fallback_display_name)
}

/// Convert a raw payload into a canonical order.
///
/// `fallback_display_name` is the sender name reported by Telegram; it is used
/// when the payload carries no usable buyer name.
pub fn normalize(raw: &Value, fallback_display_name: &str) -> Result<CanonicalOrder, PayloadError> {
    let root = raw
        .as_object()
        .ok_or_else(|| PayloadError::NotAnObject(json_kind(raw)))?;

    let empty = Map::new();
    let items: Vec<LineItem> = array_field(root, "items")
        .iter()
        .map(|entry| normalize_item(entry.as_object().unwrap_or(&empty)))
        .collect();

    let computed_total = items
        .iter()
        .fold(0u64, |acc, item| acc.saturating_add(item.subtotal));

    let order = CanonicalOrder {
        buyer: normalize_buyer(object_field(root, "user"), fallback_display_name),
        comment: optional_text_field(root, "comment"),
        declared_total: non_negative_int_field(root, "total", 0),
        computed_total,
        items,
    };

    debug!(
        item_count = order.items.len(),
        computed_total = order.computed_total,
        declared_total = order.declared_total,
        has_comment = order.comment.is_some(),
        "Order payload normalized"
    );

    Ok(order)
}

fn normalize_item(entry: &Map<String, Value>) -> LineItem {
    // Catalog builds disagree on the quantity key
    let quantity = optional_positive_int_field(entry, "qty")
        .or_else(|| optional_positive_int_field(entry, "quantity"))
        .unwrap_or(DEFAULT_QUANTITY);

    LineItem::new(
        text_field(entry, "title"),
        quantity,
        non_negative_int_field(entry, "price", DEFAULT_PRICE),
    )
}

fn normalize_buyer(user: Option<&Map<String, Value>>, fallback_display_name: &str) -> BuyerIdentity {
    let Some(user) = user else {
        return BuyerIdentity {
            display_name: fallback_display_name.to_string(),
            ..Default::default()
        };
    };

    let display_name = optional_text_field(user, "name")
        .or_else(|| {
            let parts: Vec<String> = ["first_name", "last_name"]
                .iter()
                .filter_map(|key| optional_text_field(user, key))
                .collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        })
        .unwrap_or_else(|| fallback_display_name.to_string());

    let username = optional_text_field(user, "username")
        .map(|name| name.trim_start_matches('@').to_string())
        .filter(|name| !name.is_empty());

    let external_id = user
        .get("id")
        .and_then(scalar_text)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());

    BuyerIdentity {
        display_name,
        username,
        external_id,
    }
}

/// Extract an order payload embedded in free text.
///
/// Some clients forward the catalog JSON as a plain message, sometimes with
/// surrounding words. The span from the first `{` to the last `}` is returned.
pub fn extract_embedded_payload(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Find an order payload in free text: the embedded span must parse as a
/// JSON object, so prose with stray braces is not an order.
pub fn embedded_order_payload(text: &str) -> Option<&str> {
    extract_embedded_payload(text).filter(|payload| parse_payload(payload).is_ok())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
