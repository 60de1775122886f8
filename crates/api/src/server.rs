use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use gateway_common::error::Result;
use gateway_hub::Hub;
use tower_http::cors::CorsLayer;
use tracing::info;
use utoipa::OpenApi;

use crate::state::AppState;

/// The gateway's HTTP/WebSocket surface: `GET /ws`, `GET /healthz`,
/// `GET /capabilities`, plus Swagger UI over the generated OpenAPI doc.
pub struct GatewayApi {
    state: AppState,
}

impl GatewayApi {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self {
            state: AppState::new(hub),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws", get(crate::ws::ws_handler))
            .route("/healthz", get(crate::routes::health::healthz))
            .route("/capabilities", get(crate::routes::capabilities::capabilities))
            .merge(utoipa_swagger_ui::SwaggerUi::new("/docs").url(
                "/api-doc/openapi.json",
                crate::openapi::ApiDoc::openapi(),
            ))
            .layer(axum::middleware::from_fn(
                crate::middleware::logging::logging_middleware,
            ))
            .layer(crate::middleware::logging::get_tracing_layer())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    pub async fn run(self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(gateway_common::error::GatewayError::from)?;
        info!(%addr, "gateway listening");
        axum::serve(listener, self.router())
            .await
            .map_err(|e| gateway_common::error::GatewayError::internal(e.to_string()))?;
        Ok(())
    }
}
