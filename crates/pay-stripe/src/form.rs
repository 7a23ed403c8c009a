//! # Form Encoding
//!
//! Stripe takes `application/x-www-form-urlencoded` bodies with bracketed
//! keys for nested data: `metadata[order_id]=ord_1`, `items[0][plan]=gold`.

use pay_core::Payload;
use serde_json::Value;

/// Flatten a payload into bracketed form pairs
pub fn form_params(params: &Payload) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        push_value(&mut pairs, key.clone(), value);
    }
    pairs
}

fn push_value(pairs: &mut Vec<(String, String)>, key: String, value: &Value) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (sub, nested) in map {
                push_value(pairs, format!("{}[{}]", key, sub), nested);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, item) in items.iter().enumerate() {
                push_value(pairs, format!("{}[{}]", key, i), item);
            }
        }
        // Empty containers and null clear the field
        Value::Object(_) | Value::Array(_) | Value::Null => pairs.push((key, String::new())),
        Value::String(s) => pairs.push((key, s.clone())),
        Value::Bool(b) => pairs.push((key, b.to_string())),
        Value::Number(n) => pairs.push((key, n.to_string())),
    }
}
