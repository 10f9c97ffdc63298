//! Wire types for the inbound command transport.
//!
//! The transport delivers `{commandName, requestId, parameters}` and gets
//! `{requestId, result}` back; the result field is a [`crate::envelope`]
//! value. `requestId` correlates pipelined responses on one connection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unique identifier for one bridge invocation.
///
/// UUID v4 so a late completion is attributable in logs and can never be
/// mistaken for a later call's invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationId(uuid::Uuid);

impl InvocationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One inbound command call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    pub command_name: String,

    /// Correlation id chosen by the client. The router fills in a fresh UUID
    /// when this is empty.
    #[serde(default)]
    pub request_id: String,

    #[serde(default)]
    pub parameters: Value,
}

/// The envelope for one completed call, correlated by `request_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub request_id: String,
    pub result: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_uses_camel_case_keys() {
        let request = CommandRequest {
            command_name: "get_element_id".to_string(),
            request_id: "req-1".to_string(),
            parameters: json!({"limit": 5}),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "commandName": "get_element_id",
                "requestId": "req-1",
                "parameters": {"limit": 5},
            })
        );
    }

    #[test]
    fn request_id_and_parameters_are_optional() {
        let request: CommandRequest =
            serde_json::from_value(json!({"commandName": "get_warnings"})).unwrap();
        assert_eq!(request.command_name, "get_warnings");
        assert!(request.request_id.is_empty());
        assert!(request.parameters.is_null());
    }

    #[test]
    fn response_round_trips() {
        let response = CommandResponse {
            request_id: "req-2".to_string(),
            result: json!({"success": true, "Count": 0}),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["requestId"], json!("req-2"));

        let back: CommandResponse = serde_json::from_value(value).unwrap();
        assert_eq!(back, response);
    }

    #[test]
    fn invocation_ids_are_unique() {
        assert_ne!(InvocationId::new(), InvocationId::new());
    }
}
