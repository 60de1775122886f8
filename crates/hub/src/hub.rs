//! The connection registry, subscription fan-out, and ack tracking —
//! the heart of the system (spec.md §4.6).
//!
//! Shared-state concurrency: each top-level map is a [`DashMap`], so
//! independent connections/channels don't contend on a single lock.
//! `ConnectionData` is exclusively owned here; callers (the axum
//! WebSocket handler) only ever hold a `connection_id` and the
//! `OutboundSender` half of the channel they handed in at
//! [`Hub::add_connection`].

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use gateway_common::config::HubConfig;
use gateway_common::error::{GatewayError, Result};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::auth::AgentAccessResolver;
use crate::channel::Channel;
use crate::codec::ServerMessage;
use crate::cursor::Cursor;
use crate::message::{HubMessage, MessageMetadata};
use crate::ring_buffer::RingBuffer;

pub type OutboundSender = mpsc::UnboundedSender<ServerMessage>;

#[derive(Debug, Clone)]
pub struct PendingAck {
    pub message: HubMessage,
    pub sent_at: DateTime<Utc>,
    pub replay_count: u32,
}

pub struct ConnectionData {
    pub connection_id: String,
    pub connected_at: DateTime<Utc>,
    pub auth: crate::auth::AuthContext,
    pub subscriptions: HashMap<String, Option<Cursor>>,
    pub last_heartbeat: DateTime<Utc>,
    pub pending_acks: HashMap<String, PendingAck>,
    pub generation: u64,
    sender: OutboundSender,
}

impl ConnectionData {
    fn send(&self, message: ServerMessage) {
        // Best-effort: transport send failures are not fatal here (spec.md
        // §5/§7). The heartbeat sweep is what eventually evicts a dead peer.
        let _ = self.sender.send(message);
    }
}

#[derive(Debug, Clone)]
pub struct SubscribeOutcome {
    pub cursor: Option<Cursor>,
    pub missed_messages: Vec<HubMessage>,
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct ReconnectChannelOutcome {
    pub cursor: Option<Cursor>,
    pub missed_messages: Vec<HubMessage>,
    pub ack_required: bool,
}

pub struct Hub {
    connections: DashMap<String, ConnectionData>,
    channel_index: DashMap<String, HashSet<String>>,
    buffers: DashMap<String, Arc<RingBuffer>>,
    config: Arc<HubConfig>,
    generation_counter: AtomicU64,
}

impl Hub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            connections: DashMap::new(),
            channel_index: DashMap::new(),
            buffers: DashMap::new(),
            config: Arc::new(config),
            generation_counter: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    fn buffer_for(&self, channel: &Channel, channel_str: &str) -> Arc<RingBuffer> {
        self.buffers
            .entry(channel_str.to_string())
            .or_insert_with(|| {
                let prefix = channel.capacity_prefix();
                let capacity = self
                    .config
                    .ring_buffer_capacities
                    .get(&prefix)
                    .copied()
                    .unwrap_or(self.config.default_ring_buffer_capacity);
                Arc::new(RingBuffer::new(capacity))
            })
            .clone()
    }

    #[instrument(skip(self, sender))]
    pub fn add_connection(
        &self,
        auth: crate::auth::AuthContext,
        sender: OutboundSender,
    ) -> String {
        let connection_id = Uuid::new_v4().to_string();
        let generation = self.generation_counter.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        self.connections.insert(
            connection_id.clone(),
            ConnectionData {
                connection_id: connection_id.clone(),
                connected_at: now,
                auth,
                subscriptions: HashMap::new(),
                last_heartbeat: now,
                pending_acks: HashMap::new(),
                generation,
                sender,
            },
        );
        connection_id
    }

    /// Subscribe `connection_id` to `channel_str`, replaying anything
    /// published since `since_cursor`. Idempotent — calling this twice
    /// with the same arguments has the same observable effect as once.
    #[instrument(skip(self))]
    pub fn subscribe(
        &self,
        connection_id: &str,
        channel_str: &str,
        since_cursor: Option<Cursor>,
    ) -> Result<SubscribeOutcome> {
        let channel = Channel::parse(channel_str)
            .ok_or_else(|| GatewayError::ChannelParse(channel_str.to_string()))?;

        if !self.connections.contains_key(connection_id) {
            return Err(GatewayError::ConnectionNotFound(connection_id.to_string()));
        }

        let buffer = self.buffer_for(&channel, channel_str);

        let effective_cursor = since_cursor.filter(|c| !c.is_expired(self.config.cursor_expiry_ms));
        let replay = buffer.replay(effective_cursor, None);
        let sub_cursor = replay
            .messages
            .last()
            .map(|m| m.cursor)
            .or(replay.last_cursor)
            .or_else(|| buffer.latest());

        self.channel_index
            .entry(channel_str.to_string())
            .or_default()
            .insert(connection_id.to_string());

        if let Some(mut conn) = self.connections.get_mut(connection_id) {
            conn.subscriptions
                .insert(channel_str.to_string(), sub_cursor);
        }

        Ok(SubscribeOutcome {
            cursor: sub_cursor,
            missed_messages: replay.messages,
            truncated: replay.truncated,
        })
    }

    #[instrument(skip(self))]
    pub fn unsubscribe(&self, connection_id: &str, channel_str: &str) {
        if let Some(mut set) = self.channel_index.get_mut(channel_str) {
            set.remove(connection_id);
        }
        if let Some(mut conn) = self.connections.get_mut(connection_id) {
            conn.subscriptions.remove(channel_str);
        }
    }

    /// Append to the channel's buffer and fan the message out to every
    /// subscriber present at this instant. Returns the appended message
    /// unconditionally — a subscriber's send failure never surfaces here.
    #[instrument(skip(self, payload, metadata))]
    pub fn publish(
        &self,
        channel_str: &str,
        event_type: &str,
        payload: serde_json::Value,
        metadata: Option<MessageMetadata>,
    ) -> Result<HubMessage> {
        let channel = Channel::parse(channel_str)
            .ok_or_else(|| GatewayError::ChannelParse(channel_str.to_string()))?;
        let buffer = self.buffer_for(&channel, channel_str);
        let message = buffer.append(
            channel_str.to_string(),
            event_type.to_string(),
            payload,
            metadata,
        );

        let requires_ack = channel.requires_ack();
        let subscriber_ids: Vec<String> = self
            .channel_index
            .get(channel_str)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();

        for connection_id in subscriber_ids {
            if let Some(mut conn) = self.connections.get_mut(&connection_id) {
                conn.subscriptions
                    .insert(channel_str.to_string(), Some(message.cursor));
                conn.send(ServerMessage::Message {
                    message: message.clone(),
                    ack_required: requires_ack.then_some(true),
                });
                if requires_ack {
                    conn.pending_acks.insert(
                        message.id.clone(),
                        PendingAck {
                            message: message.clone(),
                            sent_at: Utc::now(),
                            replay_count: 0,
                        },
                    );
                }
            }
        }

        Ok(message)
    }

    /// Pure query against a channel's buffer; callers are responsible
    /// for authorization before calling this.
    pub fn replay(
        &self,
        channel_str: &str,
        from_cursor: Option<Cursor>,
        limit: Option<usize>,
    ) -> crate::ring_buffer::ReplayResult {
        match self.buffers.get(channel_str) {
            Some(buffer) => buffer.replay(from_cursor, limit),
            None => crate::ring_buffer::ReplayResult {
                from_cursor,
                messages: Vec::new(),
                last_cursor: None,
                has_more: false,
                truncated: false,
            },
        }
    }

    /// Treat each `(channel, cursor)` pair as a subscribe. Callers must
    /// have already dropped any channel that failed authorization —
    /// the hub only skips channels that fail to parse.
    #[instrument(skip(self, cursors))]
    pub fn handle_reconnect(
        &self,
        connection_id: &str,
        cursors: &HashMap<String, String>,
    ) -> HashMap<String, ReconnectChannelOutcome> {
        let mut results = HashMap::new();
        for (channel_str, cursor_str) in cursors {
            let Some(channel) = Channel::parse(channel_str) else {
                debug!(channel = %channel_str, "skipping unparseable channel on reconnect");
                continue;
            };
            let cursor = Cursor::decode(cursor_str);
            match self.subscribe(connection_id, channel_str, cursor) {
                Ok(outcome) => {
                    results.insert(
                        channel_str.clone(),
                        ReconnectChannelOutcome {
                            cursor: outcome.cursor,
                            missed_messages: outcome.missed_messages,
                            ack_required: channel.requires_ack(),
                        },
                    );
                }
                Err(e) => warn!(channel = %channel_str, error = %e, "reconnect subscribe failed"),
            }
        }
        results
    }

    /// Acknowledge delivered messages. Idempotent — acking an unknown or
    /// already-acked id is a silent no-op.
    pub fn handle_ack(&self, connection_id: &str, message_ids: &[String]) {
        if let Some(mut conn) = self.connections.get_mut(connection_id) {
            for id in message_ids {
                conn.pending_acks.remove(id);
            }
        }
    }

    pub fn update_heartbeat(&self, connection_id: &str) {
        if let Some(mut conn) = self.connections.get_mut(connection_id) {
            conn.last_heartbeat = Utc::now();
        }
    }

    #[instrument(skip(self))]
    pub fn remove_connection(&self, connection_id: &str) {
        if let Some((_, removed)) = self.connections.remove(connection_id) {
            for channel_str in removed.subscriptions.keys() {
                if let Some(mut set) = self.channel_index.get_mut(channel_str) {
                    set.remove(connection_id);
                }
            }
        }
    }

    /// Resend any pending ack whose wait window has elapsed, up to
    /// `max_ack_replay` attempts; beyond the cap the hub logs and drops
    /// tracking for that id (spec.md §4.6 pending-ack replay policy).
    pub fn sweep_pending_acks(&self) {
        let now = Utc::now();
        let window = chrono::Duration::milliseconds(self.config.ack_replay_interval_ms as i64);
        for mut conn in self.connections.iter_mut() {
            let connection_id = conn.connection_id.clone();
            let mut give_up = Vec::new();
            let mut to_resend = Vec::new();
            for (id, pending) in conn.pending_acks.iter_mut() {
                if now - pending.sent_at < window {
                    continue;
                }
                if pending.replay_count >= conn_max_replay(&self.config) {
                    give_up.push(id.clone());
                    continue;
                }
                pending.replay_count += 1;
                pending.sent_at = now;
                to_resend.push(pending.message.clone());
            }
            for id in give_up {
                warn!(connection_id = %connection_id, message_id = %id, "giving up on unacked message after max replay");
                conn.pending_acks.remove(&id);
            }
            for message in to_resend {
                conn.send(ServerMessage::Message {
                    message,
                    ack_required: Some(true),
                });
            }
        }
    }

    pub fn connection_exists(&self, connection_id: &str) -> bool {
        self.connections.contains_key(connection_id)
    }

    pub fn subscriptions_of(&self, connection_id: &str) -> Option<HashMap<String, Option<Cursor>>> {
        self.connections
            .get(connection_id)
            .map(|c| c.subscriptions.clone())
    }

    pub fn pending_ack_count(&self, connection_id: &str) -> usize {
        self.connections
            .get(connection_id)
            .map(|c| c.pending_acks.len())
            .unwrap_or(0)
    }

    pub fn pending_ack_replay_count(&self, connection_id: &str, message_id: &str) -> Option<u32> {
        self.connections
            .get(connection_id)
            .and_then(|c| c.pending_acks.get(message_id).map(|p| p.replay_count))
    }

    pub fn stale_connections(&self, timeout_ms: u64) -> Vec<String> {
        let now = Utc::now();
        let timeout = chrono::Duration::milliseconds(timeout_ms as i64);
        self.connections
            .iter()
            .filter(|c| now - c.last_heartbeat > timeout)
            .map(|c| c.connection_id.clone())
            .collect()
    }

    pub fn connection_ids(&self) -> Vec<String> {
        self.connections.iter().map(|c| c.connection_id.clone()).collect()
    }

    /// Best-effort direct send, bypassing subscriptions entirely. Used
    /// by the heartbeat emitter, which targets every live connection.
    pub fn send_to(&self, connection_id: &str, message: ServerMessage) {
        if let Some(conn) = self.connections.get(connection_id) {
            conn.send(message);
        }
    }

    pub fn can_subscribe(
        &self,
        connection_id: &str,
        channel: &Channel,
        resolver: Option<&AgentAccessResolver<'_>>,
    ) -> crate::auth::AuthDecision {
        match self.connections.get(connection_id) {
            Some(conn) => crate::auth::can_subscribe(&conn.auth, channel, resolver),
            None => crate::auth::AuthDecision {
                allowed: false,
                reason: Some("unknown connection".to_string()),
            },
        }
    }
}

fn conn_max_replay(config: &HubConfig) -> u32 {
    config.max_ack_replay
}
