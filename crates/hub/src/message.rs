//! The unit of data moving through the hub: immutable once published.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cursor::Cursor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl Default for MessageMetadata {
    fn default() -> Self {
        Self {
            agent_id: None,
            workspace_id: None,
            correlation_id: None,
        }
    }
}

/// A single event published on a channel. Immutable after creation —
/// the `cursor` is assigned by the ring buffer at append time and the
/// message is never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubMessage {
    pub id: String,
    pub channel: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: serde_json::Value,
    pub cursor: Cursor,
    pub published_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl HubMessage {
    pub fn new(
        channel: String,
        event_type: String,
        payload: serde_json::Value,
        cursor: Cursor,
        metadata: Option<MessageMetadata>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            channel,
            event_type,
            payload,
            cursor,
            published_at: Utc::now(),
            metadata,
        }
    }
}
