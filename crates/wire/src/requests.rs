use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// POST body disambiguated by the presence of `key` (spec.md §4.D, S3): with
/// a `key` field it is an update-by-key request, otherwise it is treated as
/// a `FilterDocument` (filtered GET-as-POST).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateRequest {
    pub key: KeyValues,
    pub data: HashMap<String, serde_json::Value>,
}

/// `key` is itself an object carrying the key columns under `values`
/// (spec.md S3: `{"key":{"values":{"id":3}},...}`), leaving room for a
/// future `constraint` discriminator without another wire-shape change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyValues {
    pub values: HashMap<String, serde_json::Value>,
}

/// PUT body: a single row or a batch insert, both wrapped in `data`
/// (spec.md S2: `{"data":[{...},{...}]}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateRequest {
    pub data: CreateRows,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CreateRows {
    Single(HashMap<String, serde_json::Value>),
    Batch(Vec<HashMap<String, serde_json::Value>>),
}

/// DELETE body: the bare key columns under `values`, no `key` wrapper
/// (spec.md S4: `{"values":{"id":2}}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrimaryKeyRequest {
    pub values: HashMap<String, serde_json::Value>,
}

/// POST body for a callable invocation (spec.md §4.E).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CallRequest {
    #[serde(default)]
    pub arguments: HashMap<String, serde_json::Value>,
}

/// Inbound validation rejects unknown top-level keys (spec.md §4.H). Callers
/// deserialize into `serde_json::Value` first and run this check before
/// converting into the typed request above.
pub fn reject_unknown_keys(
    body: &serde_json::Value,
    allowed: &[&str],
) -> Result<(), String> {
    let serde_json::Value::Object(map) = body else {
        return Ok(());
    };
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(key.clone());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_single_object_data_deserializes_as_single() {
        let request: CreateRequest =
            serde_json::from_str(r#"{"data": {"name": "widget"}}"#).unwrap();
        assert!(matches!(request.data, CreateRows::Single(_)));
    }

    #[test]
    fn an_array_data_deserializes_as_batch() {
        let request: CreateRequest =
            serde_json::from_str(r#"{"data": [{"name": "a"}, {"name": "b"}]}"#).unwrap();
        match request.data {
            CreateRows::Batch(rows) => assert_eq!(rows.len(), 2),
            _ => panic!("expected a batch"),
        }
    }

    #[test]
    fn update_request_nests_the_key_under_values() {
        let request: UpdateRequest =
            serde_json::from_str(r#"{"key":{"values":{"id":3}},"data":{"age":41}}"#).unwrap();
        assert_eq!(request.key.values["id"], serde_json::json!(3));
        assert_eq!(request.data["age"], serde_json::json!(41));
    }

    #[test]
    fn primary_key_request_has_no_key_wrapper() {
        let request: PrimaryKeyRequest = serde_json::from_str(r#"{"values":{"id":2}}"#).unwrap();
        assert_eq!(request.values["id"], serde_json::json!(2));
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let body = serde_json::json!({"key": {}, "data": {}, "bogus": 1});
        let err = reject_unknown_keys(&body, &["key", "data"]).unwrap_err();
        assert_eq!(err, "bogus");
    }

    #[test]
    fn known_keys_pass() {
        let body = serde_json::json!({"key": {}, "data": {}});
        assert!(reject_unknown_keys(&body, &["key", "data"]).is_ok());
    }
}
