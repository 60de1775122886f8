//! Translates inbound headers into a [`gateway_hub::AuthContext`].
//!
//! Real authentication (verifying an API key, resolving a session) is
//! an external collaborator the hub only ever consumes through this
//! boundary — see spec.md §1. This reads the identity headers a
//! front-door proxy or auth middleware would already have attached.

use std::collections::HashSet;

use axum::http::HeaderMap;
use gateway_hub::AuthContext;

const HEADER_USER_ID: &str = "x-gateway-user-id";
const HEADER_API_KEY_ID: &str = "x-gateway-api-key-id";
const HEADER_WORKSPACE_IDS: &str = "x-gateway-workspace-ids";
const HEADER_ADMIN: &str = "x-gateway-admin";

pub fn extract_auth(headers: &HeaderMap) -> AuthContext {
    let header_str = |name: &str| -> Option<String> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };

    let workspace_ids: HashSet<String> = header_str(HEADER_WORKSPACE_IDS)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    AuthContext {
        user_id: header_str(HEADER_USER_ID),
        api_key_id: header_str(HEADER_API_KEY_ID),
        workspace_ids,
        is_admin: header_str(HEADER_ADMIN).as_deref() == Some("true"),
    }
}
