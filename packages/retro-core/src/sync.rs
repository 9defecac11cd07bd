/// Relay protocol message types shared between the relay server and `RelayDatabase`.
///
/// Protocol:
///   Client opens a WebSocket on `/watch/{path}`.
///   Server sends `Value` with the current document (null when absent),
///   then one `Value` per write or removal of that path.
///   `Error` is sent once before the server closes a watch it cannot serve.
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent from server to watching clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WatchMessage {
    Value { value: Option<Value> },
    Error { message: String },
}

/// Status payload served by the relay on `/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayStatus {
    pub status: String,
    pub port: u16,
    pub documents: usize,
    pub watchers: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_message_wire_shape() {
        let msg = WatchMessage::Value {
            value: Some(serde_json::json!({"sprintLabel": "4"})),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Value");
        assert_eq!(json["value"]["sprintLabel"], "4");
    }

    #[test]
    fn test_absent_value_is_null() {
        let json = serde_json::to_string(&WatchMessage::Value { value: None }).unwrap();
        assert_eq!(json, r#"{"type":"Value","value":null}"#);
        let back: WatchMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, WatchMessage::Value { value: None });
    }
}
