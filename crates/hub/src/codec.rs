//! Client↔server wire envelopes. Parsing is total — malformed input
//! yields `None`, never a panic or an `Err` the caller must match on.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::HubMessage;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe {
        channel: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cursor: Option<String>,
    },
    Unsubscribe {
        channel: String,
    },
    Ping {
        timestamp: i64,
    },
    Backfill {
        channel: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        from_cursor: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },
    Reconnect {
        cursors: HashMap<String, String>,
    },
    Ack {
        message_ids: Vec<String>,
    },
}

impl ClientMessage {
    /// Parse a single inbound text frame. Returns `None` on any
    /// malformed input — the caller surfaces `error{code=INVALID_FORMAT}`.
    pub fn parse(text: &str) -> Option<ClientMessage> {
        serde_json::from_str(text).ok()
    }

    pub fn serialize(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    pub backfill: bool,
    pub acknowledgment: bool,
    pub compression: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            backfill: true,
            acknowledgment: true,
            compression: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        connection_id: String,
        server_time: DateTime<Utc>,
        server_version: String,
        capabilities: Capabilities,
        heartbeat_interval_ms: u64,
        docs: String,
    },
    Subscribed {
        channel: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cursor: Option<String>,
    },
    Unsubscribed {
        channel: String,
    },
    Message {
        message: HubMessage,
        #[serde(skip_serializing_if = "Option::is_none")]
        ack_required: Option<bool>,
    },
    BackfillResponse {
        channel: String,
        messages: Vec<HubMessage>,
        has_more: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_cursor: Option<String>,
    },
    Pong {
        timestamp: i64,
        server_time: DateTime<Utc>,
        subscriptions: Vec<String>,
        cursors: HashMap<String, String>,
    },
    ReconnectAck {
        results: HashMap<String, ReconnectChannelResult>,
    },
    Heartbeat,
    Error {
        code: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        channel: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectChannelResult {
    pub cursor: Option<String>,
    pub messages: Vec<HubMessage>,
    pub ack_required: bool,
}

impl ServerMessage {
    /// Canonical JSON-compatible text. Field ordering is not significant.
    pub fn serialize(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"error","code":"INTERNAL_ERROR","message":"serialization failure"}"#.to_string())
    }

    pub fn error(code: &str, message: impl Into<String>, channel: Option<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            message: message.into(),
            channel,
        }
    }

    /// Parse a single inbound text frame sent by the hub. Returns `None`
    /// on malformed input.
    pub fn parse(text: &str) -> Option<ServerMessage> {
        serde_json::from_str(text).ok()
    }
}

pub const ERR_INVALID_FORMAT: &str = "INVALID_FORMAT";
pub const ERR_INVALID_CHANNEL: &str = "INVALID_CHANNEL";
pub const ERR_SUBSCRIPTION_DENIED: &str = "WS_SUBSCRIPTION_DENIED";
pub const ERR_INTERNAL: &str = "INTERNAL_ERROR";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_client_variant() {
        assert!(matches!(
            ClientMessage::parse(r#"{"type":"subscribe","channel":"system:health"}"#),
            Some(ClientMessage::Subscribe { .. })
        ));
        assert!(matches!(
            ClientMessage::parse(r#"{"type":"unsubscribe","channel":"system:health"}"#),
            Some(ClientMessage::Unsubscribe { .. })
        ));
        assert!(matches!(
            ClientMessage::parse(r#"{"type":"ping","timestamp":123}"#),
            Some(ClientMessage::Ping { .. })
        ));
        assert!(matches!(
            ClientMessage::parse(r#"{"type":"backfill","channel":"system:health"}"#),
            Some(ClientMessage::Backfill { .. })
        ));
        assert!(matches!(
            ClientMessage::parse(r#"{"type":"reconnect","cursors":{}}"#),
            Some(ClientMessage::Reconnect { .. })
        ));
        assert!(matches!(
            ClientMessage::parse(r#"{"type":"ack","message_ids":["a","b"]}"#),
            Some(ClientMessage::Ack { .. })
        ));
    }

    #[test]
    fn parse_is_total_on_garbage() {
        assert!(ClientMessage::parse("not json").is_none());
        assert!(ClientMessage::parse(r#"{"type":"unknown_type"}"#).is_none());
        assert!(ClientMessage::parse(r#"{"channel":"missing type field"}"#).is_none());
    }

    #[test]
    fn server_message_serializes_without_panicking() {
        let msg = ServerMessage::Heartbeat;
        assert_eq!(msg.serialize(), r#"{"type":"heartbeat"}"#);
    }
}
