//! Thin WebSocket client over the gateway's wire protocol. Used by both
//! the interactive REPL and the one-shot subscriber.

use anyhow::{anyhow, Context, Result};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use gateway_hub::codec::{ClientMessage, ServerMessage};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;
pub type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

pub struct GatewayClient {
    sink: WsSink,
    source: WsSource,
}

impl GatewayClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _response) = connect_async(url)
            .await
            .with_context(|| format!("connecting to {url}"))?;
        let (sink, source) = stream.split();
        Ok(Self { sink, source })
    }

    pub async fn send(&mut self, message: &ClientMessage) -> Result<()> {
        self.sink
            .send(WsMessage::Text(message.serialize().into()))
            .await
            .context("sending frame")
    }

    /// Await the next parsed server frame. Returns `Ok(None)` on a clean
    /// close, `Err` on malformed JSON or a transport-level error.
    pub async fn next_message(&mut self) -> Result<Option<ServerMessage>> {
        loop {
            match self.source.next().await {
                None => return Ok(None),
                Some(Ok(WsMessage::Text(text))) => {
                    return ServerMessage::parse(&text)
                        .map(Some)
                        .ok_or_else(|| anyhow!("malformed server frame: {text}"));
                }
                Some(Ok(WsMessage::Close(_))) => return Ok(None),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(anyhow!(e).context("websocket read error")),
            }
        }
    }
}
