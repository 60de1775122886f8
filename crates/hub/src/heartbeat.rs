//! Background maintenance: idle-connection eviction, pending-ack
//! replay, and periodic `heartbeat` frame emission.
//!
//! Three independent tickers share one `Arc<Hub>` so a slow sweep on
//! one never blocks the others. Grounded on the same periodic-task
//! shape as a cleanup loop: spawn, `tokio::select!` on an interval and
//! a shutdown signal, loop until cancelled.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{interval, Duration};
use tracing::{debug, info, instrument};

use crate::codec::ServerMessage;
use crate::hub::Hub;

pub struct HeartbeatManager {
    hub: Arc<Hub>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl HeartbeatManager {
    pub fn new(hub: Arc<Hub>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            hub,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Spawn the sweep, ack-replay, and heartbeat-emit loops. Returns
    /// immediately; call [`HeartbeatManager::shutdown`] to stop them.
    pub fn spawn(&self) {
        self.spawn_sweep_loop();
        self.spawn_ack_replay_loop();
        self.spawn_emit_loop();
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    fn spawn_sweep_loop(&self) {
        let hub = self.hub.clone();
        let mut shutdown = self.shutdown_rx.clone();
        let period = Duration::from_millis(hub.config().heartbeat_sweep_interval_ms.max(1));
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => sweep_idle_connections(&hub),
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            debug!("connection sweep loop shutting down");
                            break;
                        }
                    }
                }
            }
        });
    }

    fn spawn_ack_replay_loop(&self) {
        let hub = self.hub.clone();
        let mut shutdown = self.shutdown_rx.clone();
        let period = Duration::from_millis(hub.config().ack_replay_interval_ms.max(1));
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => hub.sweep_pending_acks(),
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            debug!("ack replay loop shutting down");
                            break;
                        }
                    }
                }
            }
        });
    }

    fn spawn_emit_loop(&self) {
        let hub = self.hub.clone();
        let mut shutdown = self.shutdown_rx.clone();
        let period = Duration::from_millis(hub.config().heartbeat_emit_interval_ms.max(1));
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => emit_heartbeats(&hub),
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            debug!("heartbeat emit loop shutting down");
                            break;
                        }
                    }
                }
            }
        });
    }
}

#[instrument(skip(hub))]
fn sweep_idle_connections(hub: &Arc<Hub>) {
    let timeout_ms = hub.config().connection_timeout_ms;
    let stale = hub.stale_connections(timeout_ms);
    for connection_id in stale {
        info!(connection_id = %connection_id, "evicting idle connection");
        hub.remove_connection(&connection_id);
    }
}

fn emit_heartbeats(hub: &Arc<Hub>) {
    for connection_id in hub.connection_ids() {
        hub.send_to(&connection_id, ServerMessage::Heartbeat);
    }
}
