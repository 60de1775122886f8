//! Shared CLI types and command plumbing for the `gateway` binary.

pub mod cli;
pub mod completions;
pub mod interactive;
pub mod oneshot;
pub mod ws_client;

pub use cli::{Cli, Commands};
