//! Canonical JSON helpers (spec Design Note "skip unchanged writes").
//!
//! Values stay `serde_json::Value` end to end rather than a bespoke tagged
//! sum type — the persistence layer already stores JSONB, so there is no
//! representation gap to bridge.

use serde_json::Value;
use std::collections::BTreeMap;

/// True iff `a` and `b` serialize to byte-identical canonical JSON, where
/// canonical means object keys sorted lexicographically at every level.
/// Used by the mutation API to skip writes that wouldn't change state.
pub fn canonical_eq(a: &Value, b: &Value) -> bool {
    canonicalize(a) == canonicalize(b)
}

fn canonicalize(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.iter().map(|(k, v)| (k.clone(), canonicalize(v))).collect();
            serde_json::to_value(sorted).expect("canonicalized map serializes")
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// A map value is only valid if every key is a string — trivially true for
/// `serde_json::Value::Object`, but nested arrays of pairs or non-object
/// "maps" supplied by a caller are rejected at the API boundary.
/// This walks recursively so nested maps are checked too.
pub fn all_keys_are_strings(v: &Value) -> bool {
    match v {
        Value::Object(map) => map.values().all(all_keys_are_strings),
        Value::Array(items) => items.iter().all(all_keys_are_strings),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_eq_ignores_key_order() {
        assert!(canonical_eq(&json!({"a": 1, "b": 2}), &json!({"b": 2, "a": 1})));
    }

    #[test]
    fn canonical_eq_detects_real_differences() {
        assert!(!canonical_eq(&json!({"a": 1}), &json!({"a": 2})));
    }

    #[test]
    fn canonical_eq_nested_objects() {
        let a = json!({"outer": {"x": 1, "y": 2}});
        let b = json!({"outer": {"y": 2, "x": 1}});
        assert!(canonical_eq(&a, &b));
    }
}
