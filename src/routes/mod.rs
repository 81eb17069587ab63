pub mod discovery;
pub mod oauth;
pub mod rest;
pub mod rpc;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

async fn health() -> &'static str {
    "ok"
}

/// Composes the full axum app: `/oauth`, `/rest`, `/rpc`, the discovery
/// document, and `/health`. `main` attaches the cookie manager and CORS
/// layers around the result.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/oauth", oauth::router())
        .nest("/rest", rest::router())
        .nest("/rpc", rpc::router())
        .merge(discovery::router())
        .with_state(state)
}
