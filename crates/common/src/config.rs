use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};

/// Top-level configuration for the gateway process.
///
/// Loaded from a TOML file (see [`GatewayConfig::load`]); every field
/// has a sensible default so a minimal or empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub hub: HubConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            hub: HubConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Hub tuning knobs. Defaults match the values called out in the spec
/// (ring buffer capacity ~1024, 30s heartbeat sweep, 90s connection
/// timeout, etc.) — see [`crate::config`] doc comment above.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Ring buffer capacity per channel-type prefix (e.g. `"agent:output"`).
    /// Prefixes not listed here fall back to `default_ring_buffer_capacity`.
    pub ring_buffer_capacities: HashMap<String, usize>,
    pub default_ring_buffer_capacity: usize,
    pub heartbeat_sweep_interval_ms: u64,
    pub heartbeat_emit_interval_ms: u64,
    pub connection_timeout_ms: u64,
    pub ack_replay_interval_ms: u64,
    pub max_ack_replay: u32,
    pub cursor_expiry_ms: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        let mut ring_buffer_capacities = HashMap::new();
        ring_buffer_capacities.insert("agent:output".to_string(), 4096);
        ring_buffer_capacities.insert("system".to_string(), 128);
        ring_buffer_capacities.insert("session".to_string(), 512);

        Self {
            ring_buffer_capacities,
            default_ring_buffer_capacity: 1024,
            heartbeat_sweep_interval_ms: 30_000,
            heartbeat_emit_interval_ms: 15_000,
            connection_timeout_ms: 90_000,
            ack_replay_interval_ms: 10_000,
            max_ack_replay: 5,
            cursor_expiry_ms: 24 * 60 * 60 * 1000,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GatewayConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from `path` if it exists, falling back to defaults
    /// otherwise. Used by the server binary so a missing `--config` flag
    /// doesn't prevent starting up.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(GatewayError::config("server.port must be non-zero"));
        }
        if self.hub.default_ring_buffer_capacity == 0 {
            return Err(GatewayError::config(
                "hub.default_ring_buffer_capacity must be non-zero",
            ));
        }
        if self.hub.max_ack_replay == 0 {
            return Err(GatewayError::config("hub.max_ack_replay must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        GatewayConfig::default().validate().unwrap();
    }

    #[test]
    fn round_trips_through_toml() {
        let config = GatewayConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: GatewayConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(
            parsed.hub.default_ring_buffer_capacity,
            config.hub.default_ring_buffer_capacity
        );
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let config = GatewayConfig::load_or_default("/nonexistent/path/gateway.toml").unwrap();
        assert_eq!(config.server.port, 8080);
    }
}
