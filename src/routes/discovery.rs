use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/.well-known/openid-configuration", get(well_known))
}

#[derive(Debug, Serialize)]
struct DiscoveryDocument {
    issuer: String,
    token_endpoint: String,
    device_authorization_endpoint: String,
    grant_types_supported: Vec<&'static str>,
    scopes_supported: Vec<&'static str>,
}

/// Minimal discovery document: enough for a device-flow client to find the
/// two endpoints it needs, not a full OIDC-conformant metadata set.
async fn well_known(State(state): State<AppState>) -> Json<DiscoveryDocument> {
    let issuer = state.config.self_ref_uri.clone();
    Json(DiscoveryDocument {
        token_endpoint: format!("{}oauth/token", issuer.trim_end_matches('/')),
        device_authorization_endpoint: format!("{}oauth/device", issuer.trim_end_matches('/')),
        issuer,
        grant_types_supported: vec![
            crate::auth::GRANT_TYPE_CLIENT_CREDENTIALS,
            crate::auth::GRANT_TYPE_DEVICE_CODE,
        ],
        scopes_supported: vec!["openid", "offline_access"],
    })
}
