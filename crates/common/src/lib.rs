//! Shared configuration, error types, and tracing setup for the gateway workspace.

pub mod config;
pub mod error;
pub mod tracing_setup;

pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use tracing_setup::init_tracing_with_level;
