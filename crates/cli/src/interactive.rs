//! Interactive REPL: type `subscribe <channel>`, `unsubscribe <channel>`,
//! `backfill <channel> [cursor] [limit]`, `ack <id> [id...]`, or `ping`;
//! incoming messages print as they arrive.

use anyhow::Result;
use gateway_hub::codec::{ClientMessage, ServerMessage};
use rustyline::DefaultEditor;
use tokio::sync::mpsc;

use crate::ws_client::GatewayClient;

pub async fn run(url: &str) -> Result<()> {
    let mut client = GatewayClient::connect(url).await?;
    println!("connected to {url} — type `help` for commands, `exit` to quit");

    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || read_lines(line_tx));

    loop {
        tokio::select! {
            frame = client.next_message() => {
                match frame {
                    Ok(Some(msg)) => print_frame(&msg),
                    Ok(None) => { println!("connection closed by server"); break; }
                    Err(e) => { println!("error: {e:#}"); break; }
                }
            }
            line = line_rx.recv() => {
                match line {
                    Some(line) if line.trim() == "exit" => break,
                    Some(line) if line.trim() == "help" => print_help(),
                    Some(line) => {
                        match parse_command(&line) {
                            Some(client_msg) => {
                                if let Err(e) = client.send(&client_msg).await {
                                    println!("send failed: {e:#}");
                                }
                            }
                            None if line.trim().is_empty() => {}
                            None => println!("unrecognized command, try `help`"),
                        }
                    }
                    None => break,
                }
            }
        }
    }

    Ok(())
}

/// Runs on a dedicated OS thread: `rustyline`'s `readline` blocks, which
/// would otherwise stall the tokio reactor driving the socket.
fn read_lines(tx: mpsc::UnboundedSender<String>) {
    let Ok(mut rl) = DefaultEditor::new() else { return };
    loop {
        match rl.readline("gateway> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
}

fn print_help() {
    println!("commands:");
    println!("  subscribe <channel> [cursor]");
    println!("  unsubscribe <channel>");
    println!("  backfill <channel> [cursor] [limit]");
    println!("  ack <id> [id...]");
    println!("  ping");
    println!("  exit");
}

fn parse_command(line: &str) -> Option<ClientMessage> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "subscribe" => Some(ClientMessage::Subscribe {
            channel: parts.next()?.to_string(),
            cursor: parts.next().map(str::to_string),
        }),
        "unsubscribe" => Some(ClientMessage::Unsubscribe {
            channel: parts.next()?.to_string(),
        }),
        "backfill" => Some(ClientMessage::Backfill {
            channel: parts.next()?.to_string(),
            from_cursor: parts.next().map(str::to_string),
            limit: parts.next().and_then(|s| s.parse().ok()),
        }),
        "ack" => {
            let ids: Vec<String> = parts.map(str::to_string).collect();
            if ids.is_empty() {
                None
            } else {
                Some(ClientMessage::Ack { message_ids: ids })
            }
        }
        "ping" => Some(ClientMessage::Ping {
            timestamp: now_ms(),
        }),
        _ => None,
    }
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn print_frame(msg: &ServerMessage) {
    match serde_json::to_string_pretty(msg) {
        Ok(json) => println!("{json}"),
        Err(_) => println!("{msg:?}"),
    }
}
