use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "gateway")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "WebSocket test client for the pub/sub coordination hub")]
pub struct Cli {
    /// Gateway WebSocket URL.
    #[arg(short, long, default_value = "ws://127.0.0.1:8080/ws")]
    pub url: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive REPL.
    Interactive,
    /// Subscribe to a single channel and print events until interrupted.
    Subscribe {
        channel: String,
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Print shell completions for the given shell.
    Completions { shell: Shell },
}
