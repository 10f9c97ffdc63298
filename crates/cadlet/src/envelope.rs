//! Uniform success/failure result envelope.
//!
//! Every command, and every error kind, serializes through this one shape:
//! `{"success": true, ...payload fields}` or
//! `{"success": false, "code": ..., "message": ...}`. The transport has a
//! single serialization path regardless of command.

use serde_json::{Map, Value, json};

use crate::error::DispatchError;

#[derive(Debug, Clone, PartialEq)]
pub enum ResultEnvelope {
    Success(Map<String, Value>),
    Failure { code: &'static str, message: String },
}

impl ResultEnvelope {
    /// Wrap a command payload. Object payloads contribute their fields
    /// directly; anything else lands under a `data` key.
    pub fn success(payload: Value) -> Self {
        let fields = match payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        Self::Success(fields)
    }

    pub fn failure(error: &DispatchError) -> Self {
        Self::Failure {
            code: error.code(),
            message: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Success(fields) => {
                let mut map = Map::with_capacity(fields.len() + 1);
                map.insert("success".to_string(), Value::Bool(true));
                for (key, value) in fields {
                    // The success flag is ours; payloads must not override it.
                    if key != "success" {
                        map.insert(key, value);
                    }
                }
                Value::Object(map)
            }
            Self::Failure { code, message } => json!({
                "success": false,
                "code": code,
                "message": message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn success_merges_payload_fields() {
        let envelope = ResultEnvelope::success(json!({"Count": 2, "Elements": []}));
        assert!(envelope.is_success());
        assert_eq!(
            envelope.into_value(),
            json!({"success": true, "Count": 2, "Elements": []})
        );
    }

    #[test]
    fn success_with_null_payload_is_bare() {
        let envelope = ResultEnvelope::success(Value::Null);
        assert_eq!(envelope.into_value(), json!({"success": true}));
    }

    #[test]
    fn success_with_scalar_payload_wraps_in_data() {
        let envelope = ResultEnvelope::success(json!(42));
        assert_eq!(envelope.into_value(), json!({"success": true, "data": 42}));
    }

    #[test]
    fn payload_cannot_override_the_success_flag() {
        let envelope = ResultEnvelope::success(json!({"success": false, "Count": 1}));
        assert_eq!(
            envelope.into_value(),
            json!({"success": true, "Count": 1})
        );
    }

    #[test]
    fn failure_carries_code_and_message() {
        let err = DispatchError::Timeout {
            command: "get_warnings".into(),
            timeout: Duration::from_secs(10),
        };
        let envelope = ResultEnvelope::failure(&err);
        assert!(!envelope.is_success());

        let value = envelope.into_value();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["code"], json!("timeout"));
        assert!(!value["message"].as_str().unwrap_or_default().is_empty());
    }
}
