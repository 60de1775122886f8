//! OpenAPI specification, generated from route handlers with `utoipa`.
//! The WebSocket surface itself isn't representable in OpenAPI — only
//! `/healthz` and `/capabilities` are documented here.

use utoipa::OpenApi;

use crate::routes::capabilities::{CapabilitiesDoc, CapabilitiesResponse};
use crate::routes::health::HealthResponse;

#[derive(utoipa::OpenApi)]
#[openapi(
    info(
        title = "Gateway Pub/Sub Hub API",
        description = "
Ancillary HTTP surface for the real-time publish/subscribe coordination
hub. The primary interface is the `/ws` WebSocket upgrade (see the
wire protocol documented alongside `gateway_hub::codec`); this page
covers the discovery and liveness endpoints that sit next to it.
        ",
        version = "0.1.0"
    ),
    paths(
        crate::routes::health::healthz,
        crate::routes::capabilities::capabilities
    ),
    components(schemas(HealthResponse, CapabilitiesResponse, CapabilitiesDoc)),
    tags(
        (name = "health", description = "Process liveness"),
        (name = "discovery", description = "Capabilities handshake, outside the socket")
    )
)]
pub struct ApiDoc;
