//! Typed field extraction from untrusted JSON.
//!
//! Every helper resolves to either a present value or an explicit default.
//! None of them fail: field-level problems never escape normalization.

use serde_json::{Map, Value};

/// Coerce a JSON value into a non-negative integer.
///
/// Integers are taken exactly, so values above 2^53 keep every digit.
/// Fractional numbers and numeric strings (`"12.9"`, `"1e3"`) are truncated
/// toward zero. Negative, non-finite or unparsable input yields `None`.
pub fn as_non_negative_int(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => {
            if let Some(exact) = n.as_u64() {
                return Some(exact);
            }
            if n.is_i64() {
                // A negative integer
                return None;
            }
            n.as_f64().and_then(truncate_non_negative)
        }
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate_non_negative))
        }
        _ => None,
    }
}

/// Truncate toward zero into `u64`, saturating at the upper bound.
/// Negative and non-finite inputs return `None`.
fn truncate_non_negative(number: f64) -> Option<u64> {
    if !number.is_finite() {
        return None;
    }
    let truncated = number.trunc();
    if truncated < 0.0 {
        return None;
    }
    // `as` saturates for floats above u64::MAX
    Some(truncated as u64)
}

/// Read a quantity-like field: a positive integer after truncation, or `None`
/// when absent, unparsable or not positive.
pub fn optional_positive_int_field(object: &Map<String, Value>, key: &str) -> Option<u64> {
    object
        .get(key)
        .and_then(as_non_negative_int)
        .filter(|value| *value > 0)
}

/// Read a quantity-like field, falling back to `default`
pub fn positive_int_field(object: &Map<String, Value>, key: &str, default: u64) -> u64 {
    optional_positive_int_field(object, key).unwrap_or(default)
}

/// Read a money-like field: a non-negative integer truncated toward zero, or
/// `default` when absent, negative or unparsable.
pub fn non_negative_int_field(object: &Map<String, Value>, key: &str, default: u64) -> u64 {
    object
        .get(key)
        .and_then(as_non_negative_int)
        .unwrap_or(default)
}

/// Render a scalar as text. Strings are returned as-is, numbers and booleans
/// are stringified, everything else is absent.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read a text field, falling back to the empty string
pub fn text_field(object: &Map<String, Value>, key: &str) -> String {
    object.get(key).and_then(scalar_text).unwrap_or_default()
}

/// Read a text field, trimmed; empty after trimming is absent
pub fn optional_text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(scalar_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Read a nested object, if the key holds one
pub fn object_field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    object.get(key).and_then(Value::as_object)
}

/// Read an array field; anything that is not an array is an empty slice
pub fn array_field<'a>(object: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_as_non_negative_int_coercion() {
        assert_eq!(as_non_negative_int(&json!("12.9")), Some(12));
        assert_eq!(as_non_negative_int(&json!(" 7 ")), Some(7));
        assert_eq!(as_non_negative_int(&json!("1e3")), Some(1000));
        assert_eq!(as_non_negative_int(&json!(-3)), None);
        assert_eq!(as_non_negative_int(&json!("-3")), None);
        assert_eq!(as_non_negative_int(&json!("abc")), None);
        assert_eq!(as_non_negative_int(&json!("NaN")), None);
        assert_eq!(as_non_negative_int(&json!("inf")), None);
        assert_eq!(as_non_negative_int(&json!(null)), None);
        assert_eq!(as_non_negative_int(&json!([1])), None);
    }

    #[test]
    fn test_large_integers_keep_precision() {
        // 2^53 + 1 is not representable as f64
        let map = obj(json!({"n": 9007199254740993u64, "s": "9007199254740993", "max": u64::MAX}));
        assert_eq!(non_negative_int_field(&map, "n", 0), 9_007_199_254_740_993);
        assert_eq!(non_negative_int_field(&map, "s", 0), 9_007_199_254_740_993);
        assert_eq!(non_negative_int_field(&map, "max", 0), u64::MAX);
    }

    #[test]
    fn test_positive_int_field_defaults() {
        let map = obj(json!({"a": 3, "b": 0, "c": -2, "d": "x", "e": 2.7, "f": 0.5}));
        assert_eq!(positive_int_field(&map, "a", 1), 3);
        assert_eq!(positive_int_field(&map, "b", 1), 1);
        assert_eq!(positive_int_field(&map, "c", 1), 1);
        assert_eq!(positive_int_field(&map, "d", 1), 1);
        assert_eq!(positive_int_field(&map, "e", 1), 2);
        assert_eq!(positive_int_field(&map, "f", 1), 1);
        assert_eq!(positive_int_field(&map, "missing", 1), 1);
        assert_eq!(optional_positive_int_field(&map, "b"), None);
        assert_eq!(optional_positive_int_field(&map, "a"), Some(3));
    }

    #[test]
    fn test_non_negative_int_field_truncates() {
        let map = obj(json!({"a": 99.99, "b": "150.5", "c": -10, "d": true, "e": -0.5}));
        assert_eq!(non_negative_int_field(&map, "a", 0), 99);
        assert_eq!(non_negative_int_field(&map, "b", 0), 150);
        assert_eq!(non_negative_int_field(&map, "c", 0), 0);
        assert_eq!(non_negative_int_field(&map, "d", 0), 0);
        // -0.5 truncates to -0.0, which is not below zero
        assert_eq!(non_negative_int_field(&map, "e", 0), 0);
    }

    #[test]
    fn test_huge_values_saturate() {
        let map = obj(json!({"a": 1e30}));
        assert_eq!(non_negative_int_field(&map, "a", 0), u64::MAX);
    }

    #[test]
    fn test_text_fields() {
        let map = obj(json!({"s": "  hi  ", "n": 42, "b": false, "o": {}, "blank": "   "}));
        assert_eq!(text_field(&map, "s"), "  hi  ");
        assert_eq!(text_field(&map, "n"), "42");
        assert_eq!(text_field(&map, "b"), "false");
        assert_eq!(text_field(&map, "o"), "");
        assert_eq!(optional_text_field(&map, "s"), Some("hi".to_string()));
        assert_eq!(optional_text_field(&map, "blank"), None);
        assert_eq!(optional_text_field(&map, "missing"), None);
    }

    #[test]
    fn test_array_field_non_array_is_empty() {
        let map = obj(json!({"items": "nope", "list": [1, 2]}));
        assert!(array_field(&map, "items").is_empty());
        assert_eq!(array_field(&map, "list").len(), 2);
        assert!(array_field(&map, "missing").is_empty());
    }
}
