//! The publish/subscribe coordination core: channels, cursors, the
//! bounded per-channel log, authorization, the wire codec, and the
//! connection registry that ties them together.

pub mod auth;
pub mod channel;
pub mod codec;
pub mod cursor;
pub mod heartbeat;
pub mod hub;
pub mod message;
pub mod ring_buffer;

pub use auth::{AgentAccessResolver, AuthContext, AuthDecision};
pub use channel::Channel;
pub use codec::{ClientMessage, ServerMessage};
pub use cursor::Cursor;
pub use gateway_common::error::{GatewayError, Result};
pub use heartbeat::HeartbeatManager;
pub use hub::Hub;
pub use message::{HubMessage, MessageMetadata};
pub use ring_buffer::{ReplayResult, RingBuffer};

use std::sync::Arc;

use once_cell::sync::OnceCell;

static HUB: OnceCell<Arc<Hub>> = OnceCell::new();

/// Install the process-wide hub instance. Panics if called twice —
/// the binary entry point owns this, it's not meant to be re-invoked.
pub fn init(config: gateway_common::config::HubConfig) -> Arc<Hub> {
    let hub = Arc::new(Hub::new(config));
    HUB.set(hub.clone())
        .unwrap_or_else(|_| panic!("gateway_hub::init called more than once"));
    hub
}

/// The process-wide hub instance, if [`init`] has run.
pub fn instance() -> Option<Arc<Hub>> {
    HUB.get().cloned()
}

#[cfg(test)]
pub mod test_support {
    //! Per-test hub construction, bypassing the process-wide singleton.
    use super::*;
    use gateway_common::config::HubConfig;

    pub fn fresh_hub() -> Arc<Hub> {
        Arc::new(Hub::new(HubConfig::default()))
    }
}
