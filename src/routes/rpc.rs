use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::gate::{DataAction, GateError};
use crate::snapshot::{AppSnapshot, SnapshotError};
use crate::state::AppState;

fn wants_yaml(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("yaml"))
        .unwrap_or(false)
}

fn is_yaml_body(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("yaml"))
        .unwrap_or(false)
}

/// `/rpc/recovery` — the snapshot export/import surface (C12), gated on
/// `idp.root`/`idp.admin` the same way the REST namespaces gate on
/// `idp.<kind>.<action>`; recovery touches every table at once so it doesn't
/// get its own namespace.
pub fn router() -> Router<AppState> {
    Router::new().route("/recovery", get(export).post(import))
}

pub struct RpcError(StatusCode, String);

impl From<GateError> for RpcError {
    fn from(e: GateError) -> Self {
        let status = match e {
            GateError::MissingToken => StatusCode::UNAUTHORIZED,
            GateError::InvalidToken => StatusCode::UNAUTHORIZED,
            GateError::AccessDenied => StatusCode::FORBIDDEN,
        };
        RpcError(status, e.to_string())
    }
}

impl From<SnapshotError> for RpcError {
    fn from(e: SnapshotError) -> Self {
        tracing::error!(error = %e, "snapshot operation failed");
        RpcError(StatusCode::INTERNAL_SERVER_ERROR, "server_error".to_string())
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Accepts `Accept: application/yaml` for operators restoring from a
/// hand-edited snapshot file; everything else gets JSON.
async fn export(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, RpcError> {
    state
        .gate
        .authorize(bearer(&headers), "idp", DataAction::Read)?;
    let snapshot = state.snapshot.export().await?;
    if wants_yaml(&headers) {
        let body = serde_yaml::to_string(&snapshot).map_err(|_| {
            RpcError(StatusCode::INTERNAL_SERVER_ERROR, "server_error".to_string())
        })?;
        return Ok((
            [(header::CONTENT_TYPE, "application/yaml")],
            body,
        )
            .into_response());
    }
    Ok(Json(snapshot).into_response())
}

async fn import(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, RpcError> {
    state
        .gate
        .authorize(bearer(&headers), "idp", DataAction::Write)?;
    let snapshot: AppSnapshot = if is_yaml_body(&headers) {
        serde_yaml::from_slice(&body)
            .map_err(|_| RpcError(StatusCode::BAD_REQUEST, "invalid_yaml_body".to_string()))?
    } else {
        serde_json::from_slice(&body)
            .map_err(|_| RpcError(StatusCode::BAD_REQUEST, "invalid_json_body".to_string()))?
    };
    state.snapshot.import(&snapshot).await?;
    Ok(StatusCode::NO_CONTENT)
}
