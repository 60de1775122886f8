//! WebSocket upgrade and the per-connection `onOpen`/`onMessage`/`onClose`
//! lifecycle (spec.md §4.8), wired over `axum::extract::ws`.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use gateway_hub::codec::{Capabilities, ServerMessage, ERR_INTERNAL, ERR_INVALID_CHANNEL, ERR_INVALID_FORMAT, ERR_SUBSCRIPTION_DENIED};
use gateway_hub::{auth, AuthContext, Channel, ClientMessage, Cursor};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Pre-seeded subscriptions: `channel=cursor,channel=cursor`. `=cursor`
    /// may be omitted to mean "from the beginning".
    pub subscribe: Option<String>,
}

fn parse_pre_seeded(raw: &str) -> Vec<(String, Option<String>)> {
    raw.split(',')
        .filter(|s| !s.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((channel, cursor)) => (channel.to_string(), Some(cursor.to_string())),
            None => (entry.to_string(), None),
        })
        .collect()
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    let auth = crate::auth_extract::extract_auth(&headers);
    let pre_seeded = query.subscribe.as_deref().map(parse_pre_seeded).unwrap_or_default();
    ws.on_upgrade(move |socket| handle_socket(socket, state, auth, pre_seeded))
}

#[instrument(skip(socket, state, auth, pre_seeded))]
async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    auth: AuthContext,
    pre_seeded: Vec<(String, Option<String>)>,
) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ServerMessage>();
    let connection_id = state.hub.add_connection(auth.clone(), tx.clone());
    info!(connection_id = %connection_id, "connection opened");

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(Message::Text(message.serialize().into())).await.is_err() {
                break;
            }
        }
    });

    apply_pre_seeded_subscriptions(&state, &connection_id, &auth, pre_seeded, &tx);

    let _ = tx.send(ServerMessage::Connected {
        connection_id: connection_id.clone(),
        server_time: Utc::now(),
        server_version: state.server_version.clone(),
        capabilities: Capabilities::default(),
        heartbeat_interval_ms: state.hub.config().heartbeat_emit_interval_ms,
        docs: "/capabilities".to_string(),
    });

    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                handle_client_text(&state, &connection_id, &auth, &text, &tx);
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(connection_id = %connection_id, error = %e, "websocket read error");
                break;
            }
        }
    }

    state.hub.remove_connection(&connection_id);
    writer.abort();
    debug!(connection_id = %connection_id, "connection closed");
}

fn apply_pre_seeded_subscriptions(
    state: &AppState,
    connection_id: &str,
    auth: &AuthContext,
    pre_seeded: Vec<(String, Option<String>)>,
    tx: &tokio::sync::mpsc::UnboundedSender<ServerMessage>,
) {
    for (channel_str, cursor_str) in pre_seeded {
        let Some(channel) = Channel::parse(&channel_str) else {
            debug!(channel = %channel_str, "pre-seeded channel failed to parse, dropping");
            continue;
        };
        let decision = auth::can_subscribe(auth, &channel, None);
        if !decision.allowed {
            debug!(channel = %channel_str, "pre-seeded subscription denied, dropping");
            continue;
        }
        let cursor = cursor_str.as_deref().and_then(Cursor::decode);
        match state.hub.subscribe(connection_id, &channel_str, cursor) {
            Ok(outcome) => {
                for message in outcome.missed_messages {
                    let ack_required = channel.requires_ack().then_some(true);
                    let _ = tx.send(ServerMessage::Message { message, ack_required });
                }
            }
            Err(e) => warn!(channel = %channel_str, error = %e, "pre-seeded subscribe failed"),
        }
    }
}

fn handle_client_text(
    state: &AppState,
    connection_id: &str,
    auth: &AuthContext,
    text: &str,
    tx: &tokio::sync::mpsc::UnboundedSender<ServerMessage>,
) {
    state.hub.update_heartbeat(connection_id);

    let Some(message) = ClientMessage::parse(text) else {
        let _ = tx.send(ServerMessage::error(ERR_INVALID_FORMAT, "could not parse message", None));
        return;
    };

    match message {
        ClientMessage::Subscribe { channel, cursor } => {
            handle_subscribe(state, connection_id, auth, channel, cursor, tx)
        }
        ClientMessage::Unsubscribe { channel } => {
            state.hub.unsubscribe(connection_id, &channel);
            let _ = tx.send(ServerMessage::Unsubscribed { channel });
        }
        ClientMessage::Ping { timestamp } => handle_ping(state, connection_id, timestamp, tx),
        ClientMessage::Backfill { channel, from_cursor, limit } => {
            handle_backfill(state, auth, channel, from_cursor, limit, tx)
        }
        ClientMessage::Reconnect { cursors } => {
            handle_reconnect(state, connection_id, auth, cursors, tx)
        }
        ClientMessage::Ack { message_ids } => {
            state.hub.handle_ack(connection_id, &message_ids);
        }
    }
}

fn handle_subscribe(
    state: &AppState,
    connection_id: &str,
    auth: &AuthContext,
    channel_str: String,
    cursor_str: Option<String>,
    tx: &tokio::sync::mpsc::UnboundedSender<ServerMessage>,
) {
    let Some(channel) = Channel::parse(&channel_str) else {
        let _ = tx.send(ServerMessage::error(ERR_INVALID_CHANNEL, "unrecognized channel", Some(channel_str)));
        return;
    };
    let decision = auth::can_subscribe(auth, &channel, None);
    if !decision.allowed {
        let reason = decision.reason.unwrap_or_else(|| "subscription denied".to_string());
        let _ = tx.send(ServerMessage::error(ERR_SUBSCRIPTION_DENIED, reason, Some(channel_str)));
        return;
    }

    let cursor = cursor_str.as_deref().and_then(Cursor::decode);
    match state.hub.subscribe(connection_id, &channel_str, cursor) {
        Ok(outcome) => {
            for message in outcome.missed_messages {
                let ack_required = channel.requires_ack().then_some(true);
                let _ = tx.send(ServerMessage::Message { message, ack_required });
            }
            let _ = tx.send(ServerMessage::Subscribed {
                channel: channel_str,
                cursor: outcome.cursor.map(|c| c.encode()),
            });
        }
        Err(e) => {
            let _ = tx.send(ServerMessage::error(ERR_INTERNAL, e.to_string(), Some(channel_str)));
        }
    }
}

fn handle_ping(
    state: &AppState,
    connection_id: &str,
    timestamp: i64,
    tx: &tokio::sync::mpsc::UnboundedSender<ServerMessage>,
) {
    let subscriptions = state.hub.subscriptions_of(connection_id).unwrap_or_default();
    let mut cursors = std::collections::HashMap::new();
    let mut channels = Vec::new();
    for (channel, cursor) in subscriptions {
        if let Some(cursor) = cursor {
            cursors.insert(channel.clone(), cursor.encode());
        }
        channels.push(channel);
    }
    let _ = tx.send(ServerMessage::Pong {
        timestamp,
        server_time: Utc::now(),
        subscriptions: channels,
        cursors,
    });
}

fn handle_backfill(
    state: &AppState,
    auth: &AuthContext,
    channel_str: String,
    from_cursor: Option<String>,
    limit: Option<usize>,
    tx: &tokio::sync::mpsc::UnboundedSender<ServerMessage>,
) {
    let Some(channel) = Channel::parse(&channel_str) else {
        let _ = tx.send(ServerMessage::error(ERR_INVALID_CHANNEL, "unrecognized channel", Some(channel_str)));
        return;
    };
    let decision = auth::can_subscribe(auth, &channel, None);
    if !decision.allowed {
        let reason = decision.reason.unwrap_or_else(|| "backfill denied".to_string());
        let _ = tx.send(ServerMessage::error(ERR_SUBSCRIPTION_DENIED, reason, Some(channel_str)));
        return;
    }

    let cursor = from_cursor.as_deref().and_then(Cursor::decode);
    let result = state.hub.replay(&channel_str, cursor, limit);
    let _ = tx.send(ServerMessage::BackfillResponse {
        channel: channel_str,
        messages: result.messages,
        has_more: result.has_more,
        last_cursor: result.last_cursor.map(|c| c.encode()),
    });
}

fn handle_reconnect(
    state: &AppState,
    connection_id: &str,
    auth: &AuthContext,
    cursors: std::collections::HashMap<String, String>,
    tx: &tokio::sync::mpsc::UnboundedSender<ServerMessage>,
) {
    let authorized: std::collections::HashMap<String, String> = cursors
        .into_iter()
        .filter(|(channel_str, _)| {
            Channel::parse(channel_str)
                .map(|channel| auth::can_subscribe(auth, &channel, None).allowed)
                .unwrap_or(false)
        })
        .collect();

    let outcomes = state.hub.handle_reconnect(connection_id, &authorized);
    let results = outcomes
        .into_iter()
        .map(|(channel, outcome)| {
            (
                channel,
                gateway_hub::codec::ReconnectChannelResult {
                    cursor: outcome.cursor.map(|c| c.encode()),
                    messages: outcome.missed_messages,
                    ack_required: outcome.ack_required,
                },
            )
        })
        .collect();

    let _ = tx.send(ServerMessage::ReconnectAck { results });
}
