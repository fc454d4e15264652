//! Canonical serialization for registry operations
//!
//! Identifier derivation requires that identical genesis input always hash
//! to identical bytes: object keys are sorted recursively before the value
//! is serialized to DAG-CBOR.

use coopnet_common::{Error, Result};
use serde_json::{Map, Value};

/// Recursively sort all object keys in a JSON value
pub fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(&String, &Value)> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));

            let mut out = Map::new();
            for (k, v) in sorted {
                out.insert(k.clone(), sort_keys(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Serialize a JSON value to canonical DAG-CBOR bytes
pub fn to_canonical_bytes(value: &Value) -> Result<Vec<u8>> {
    serde_ipld_dagcbor::to_vec(&sort_keys(value))
        .map_err(|e| Error::serialization(format!("Failed to canonicalize operation: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_order_does_not_change_bytes() {
        let a = json!({"handle": "alice", "services": {"b": 2, "a": 1}});
        let b = json!({"services": {"a": 1, "b": 2}, "handle": "alice"});

        assert_eq!(
            to_canonical_bytes(&a).unwrap(),
            to_canonical_bytes(&b).unwrap()
        );
    }

    #[test]
    fn test_different_values_change_bytes() {
        let a = json!({"handle": "alice"});
        let b = json!({"handle": "bob"});
        assert_ne!(
            to_canonical_bytes(&a).unwrap(),
            to_canonical_bytes(&b).unwrap()
        );
    }

    #[test]
    fn test_arrays_preserve_order() {
        let a = json!({"keys": ["k1", "k2"]});
        let b = json!({"keys": ["k2", "k1"]});
        assert_ne!(
            to_canonical_bytes(&a).unwrap(),
            to_canonical_bytes(&b).unwrap()
        );
    }
}
