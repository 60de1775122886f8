use std::sync::Arc;

use gateway_hub::Hub;

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub server_version: String,
}

impl AppState {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self {
            hub,
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
