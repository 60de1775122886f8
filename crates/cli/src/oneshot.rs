//! One-shot mode: subscribe to a single channel, print events as they
//! arrive, exit on Ctrl-C. Useful for scripting and integration checks.

use anyhow::Result;
use gateway_hub::codec::ClientMessage;

use crate::ws_client::GatewayClient;

pub async fn subscribe(url: &str, channel: &str, cursor: Option<String>) -> Result<()> {
    let mut client = GatewayClient::connect(url).await?;
    client
        .send(&ClientMessage::Subscribe {
            channel: channel.to_string(),
            cursor,
        })
        .await?;

    loop {
        tokio::select! {
            frame = client.next_message() => {
                match frame? {
                    Some(msg) => println!("{}", serde_json::to_string(&msg)?),
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}
