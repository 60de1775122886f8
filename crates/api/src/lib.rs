//! HTTP/WebSocket transport for the publish/subscribe coordination hub.
//!
//! Layered the way the rest of the workspace is: `gateway-hub` owns
//! every invariant; this crate only translates transport events into
//! hub calls and hub results back into wire frames (spec.md §4.9).
//!
//! - `GET /ws` — upgrades to WebSocket, runs the connection lifecycle.
//! - `GET /healthz` — process liveness.
//! - `GET /capabilities` — the `connected` frame's capabilities object,
//!   reachable without opening a socket.
//! - `GET /docs` — Swagger UI over the two HTTP endpoints above.

pub mod auth_extract;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;
pub mod ws;

pub use server::GatewayApi;
pub use state::AppState;
