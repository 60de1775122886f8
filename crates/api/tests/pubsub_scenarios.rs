//! End-to-end coverage of spec.md §8's scenarios S1-S5, driving a real
//! hub + axum WebSocket handler over loopback TCP. S6 (channel parsing
//! with embedded colons) is covered at the unit level in `gateway-hub`.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gateway_api::GatewayApi;
use gateway_common::config::HubConfig;
use gateway_hub::codec::{ClientMessage, ServerMessage};
use gateway_hub::Hub;
use http::Request;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Conn = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server(config: HubConfig) -> (String, Arc<Hub>) {
    let hub = Arc::new(Hub::new(config));
    let api = GatewayApi::new(hub.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = api.router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("127.0.0.1:{}", addr.port()), hub)
}

async fn connect(addr: &str, path: &str, headers: &[(&str, &str)]) -> Conn {
    let url = format!("ws://{addr}{path}");
    let mut request: Request<()> = url.into_client_request().unwrap();
    for (k, v) in headers {
        request
            .headers_mut()
            .insert(*k, http::HeaderValue::from_str(v).unwrap());
    }
    let (stream, _) = connect_async(request).await.unwrap();
    stream
}

async fn recv(conn: &mut Conn) -> ServerMessage {
    loop {
        match conn.next().await.expect("stream ended").unwrap() {
            WsMessage::Text(text) => return ServerMessage::parse(&text).expect("valid frame"),
            _ => continue,
        }
    }
}

async fn send(conn: &mut Conn, msg: &ClientMessage) {
    conn.send(WsMessage::Text(msg.serialize().into())).await.unwrap();
}

#[tokio::test]
async fn s1_denied_initial_subscription() {
    let (addr, hub) = spawn_server(HubConfig::default()).await;
    let mut conn = connect(&addr, "/ws?subscribe=agent:output:agent-1=0", &[]).await;

    let connected = recv(&mut conn).await;
    let ServerMessage::Connected { connection_id, .. } = connected else {
        panic!("expected connected frame, got {connected:?}");
    };
    assert!(hub.subscriptions_of(&connection_id).unwrap().is_empty());
}

#[tokio::test]
async fn s2_admin_initial_subscription_preserved() {
    let (addr, hub) = spawn_server(HubConfig::default()).await;
    let mut conn = connect(
        &addr,
        "/ws?subscribe=agent:output:agent-1=0",
        &[("x-gateway-admin", "true")],
    )
    .await;

    let connected = recv(&mut conn).await;
    let ServerMessage::Connected { connection_id, .. } = connected else {
        panic!("expected connected frame, got {connected:?}");
    };
    let subs = hub.subscriptions_of(&connection_id).unwrap();
    assert!(subs.contains_key("agent:output:agent-1"));
}

#[tokio::test]
async fn s3_subscribe_from_zero_advances_to_latest() {
    let (addr, hub) = spawn_server(HubConfig::default()).await;
    let mut conn = connect(&addr, "/ws", &[("x-gateway-admin", "true")]).await;
    let _connected = recv(&mut conn).await;

    let a = hub
        .publish("agent:output:agent-1", "t", serde_json::json!({"n": 1}), None)
        .unwrap();
    let b = hub
        .publish("agent:output:agent-1", "t", serde_json::json!({"n": 2}), None)
        .unwrap();

    send(
        &mut conn,
        &ClientMessage::Subscribe {
            channel: "agent:output:agent-1".to_string(),
            cursor: Some("0".to_string()),
        },
    )
    .await;

    let first = recv(&mut conn).await;
    let ServerMessage::Message { message, .. } = first else { panic!("expected message, got {first:?}") };
    assert_eq!(message.id, a.id);

    let second = recv(&mut conn).await;
    let ServerMessage::Message { message, .. } = second else { panic!("expected message, got {second:?}") };
    assert_eq!(message.id, b.id);

    let subscribed = recv(&mut conn).await;
    let ServerMessage::Subscribed { cursor, .. } = subscribed else {
        panic!("expected subscribed, got {subscribed:?}")
    };
    assert_eq!(cursor, Some(b.cursor.encode()));
}

#[tokio::test]
async fn s4_ack_required_replay_then_gives_up() {
    let config = HubConfig {
        max_ack_replay: 2,
        ack_replay_interval_ms: 0,
        ..HubConfig::default()
    };
    let (addr, hub) = spawn_server(config).await;
    let mut conn = connect(&addr, "/ws", &[("x-gateway-admin", "true")]).await;
    let _connected = recv(&mut conn).await;

    send(
        &mut conn,
        &ClientMessage::Subscribe {
            channel: "workspace:conflicts:w1".to_string(),
            cursor: None,
        },
    )
    .await;
    let subscribed = recv(&mut conn).await;
    assert!(matches!(subscribed, ServerMessage::Subscribed { .. }));

    let published = hub
        .publish("workspace:conflicts:w1", "conflict", serde_json::json!({}), None)
        .unwrap();
    let first = recv(&mut conn).await;
    let ServerMessage::Message { message, ack_required } = first else {
        panic!("expected message, got {first:?}")
    };
    assert_eq!(message.id, published.id);
    assert_eq!(ack_required, Some(true));

    // Drive the replay sweep directly rather than waiting on a real clock.
    let connection_id = hub.connection_ids().into_iter().next().unwrap();
    hub.sweep_pending_acks();
    assert_eq!(hub.pending_ack_replay_count(&connection_id, &published.id), Some(1));
    let replay = recv(&mut conn).await;
    assert!(matches!(replay, ServerMessage::Message { .. }));

    hub.sweep_pending_acks();
    assert_eq!(hub.pending_ack_replay_count(&connection_id, &published.id), Some(2));
    let _ = recv(&mut conn).await;

    hub.sweep_pending_acks(); // exceeds max_ack_replay, gives up silently
    assert_eq!(hub.pending_ack_count(&connection_id), 0);
}

#[tokio::test]
async fn s5_reconnect_with_cursor_replays_missed_messages() {
    let (addr, hub) = spawn_server(HubConfig::default()).await;

    let mut first_conn = connect(&addr, "/ws", &[("x-gateway-user-id", "u1")]).await;
    let _connected = recv(&mut first_conn).await;
    send(
        &mut first_conn,
        &ClientMessage::Subscribe {
            channel: "user:notifications:u1".to_string(),
            cursor: None,
        },
    )
    .await;
    let subscribed = recv(&mut first_conn).await;
    assert!(matches!(subscribed, ServerMessage::Subscribed { .. }));

    drop(first_conn);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let m2 = hub
        .publish("user:notifications:u1", "note", serde_json::json!({"n": 2}), None)
        .unwrap();
    let m3 = hub
        .publish("user:notifications:u1", "note", serde_json::json!({"n": 3}), None)
        .unwrap();

    let mut second_conn = connect(&addr, "/ws", &[("x-gateway-user-id", "u1")]).await;
    let connected = recv(&mut second_conn).await;
    let ServerMessage::Connected { connection_id, .. } = connected else {
        panic!("expected connected frame, got {connected:?}")
    };

    let mut cursors = std::collections::HashMap::new();
    cursors.insert("user:notifications:u1".to_string(), "0".to_string());
    send(&mut second_conn, &ClientMessage::Reconnect { cursors }).await;

    let ack = recv(&mut second_conn).await;
    let ServerMessage::ReconnectAck { results } = ack else {
        panic!("expected reconnect_ack, got {ack:?}")
    };
    let result = results.get("user:notifications:u1").expect("channel present in results");
    assert!(result.ack_required);
    assert_eq!(result.messages.len(), 2);
    assert_eq!(result.messages[0].id, m2.id);
    assert_eq!(result.messages[1].id, m3.id);
    assert_eq!(result.cursor, Some(m3.cursor.encode()));

    let subs = hub.subscriptions_of(&connection_id).unwrap();
    assert_eq!(
        subs.get("user:notifications:u1").copied().flatten(),
        Some(m3.cursor)
    );
}
