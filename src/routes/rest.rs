use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::gate::{DataAction, GateError};
use crate::state::AppState;
use crate::store::models::{OAuthClient, Policy, Role, Scope, User};
use crate::store::StoreError;

/// Admin CRUD surface: `/rest/{scopes,roles,users,clients,policies}`, each
/// namespace gated on `idp.<kind>.<action>` (or a privileged scope) via
/// [`crate::gate::AuthorizationGate`].
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/scopes", scopes_router())
        .nest("/roles", roles_router())
        .nest("/users", users_router())
        .nest("/clients", clients_router())
        .nest("/policies", policies_router())
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

fn full_access(headers: &HeaderMap, claims: &crate::token::AccessClaims) -> bool {
    let access_level = headers
        .get("x-access-level")
        .and_then(|v| v.to_str().ok());
    crate::gate::AuthorizationGate::has_full_access(claims, access_level)
}

pub struct RestError(StatusCode, String);

impl From<GateError> for RestError {
    fn from(e: GateError) -> Self {
        let status = match e {
            GateError::MissingToken => StatusCode::UNAUTHORIZED,
            GateError::InvalidToken => StatusCode::UNAUTHORIZED,
            GateError::AccessDenied => StatusCode::FORBIDDEN,
        };
        RestError(status, e.to_string())
    }
}

impl From<StoreError> for RestError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => RestError(StatusCode::CONFLICT, "duplicate".to_string()),
            StoreError::CryptoUnavailable => {
                RestError(StatusCode::SERVICE_UNAVAILABLE, "crypto_unavailable".to_string())
            }
            StoreError::Sql(e) => {
                tracing::error!(error = %e, "store error while serving rest route");
                RestError(StatusCode::INTERNAL_SERVER_ERROR, "server_error".to_string())
            }
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

macro_rules! entity_router {
    ($router_fn:ident, $namespace:expr, $model:ty, $store_field:ident) => {
        fn $router_fn() -> Router<AppState> {
            Router::new()
                .route("/", get(list).post(create))
                .route("/:id", get(read).patch(update).put(update).delete(remove))
        }

        async fn list(
            State(state): State<AppState>,
            headers: HeaderMap,
        ) -> Result<Json<Vec<$model>>, RestError> {
            state
                .gate
                .authorize(bearer(&headers), $namespace, DataAction::List)?;
            let items = state.$store_field.select_all().await?;
            Ok(Json(items))
        }

        async fn read(
            State(state): State<AppState>,
            headers: HeaderMap,
            Path(id): Path<String>,
        ) -> Result<Json<$model>, RestError> {
            state
                .gate
                .authorize(bearer(&headers), $namespace, DataAction::Read)?;
            let item = state
                .$store_field
                .get(&id)
                .await?
                .ok_or_else(|| RestError(StatusCode::NOT_FOUND, "not_found".to_string()))?;
            Ok(Json(item))
        }

        async fn create(
            State(state): State<AppState>,
            headers: HeaderMap,
            Json(mut item): Json<$model>,
        ) -> Result<Json<$model>, RestError> {
            state
                .gate
                .authorize(bearer(&headers), $namespace, DataAction::Write)?;
            item.id = uuid::Uuid::new_v4();
            state.$store_field.insert(&item).await?;
            Ok(Json(item))
        }

        async fn update(
            State(state): State<AppState>,
            headers: HeaderMap,
            Path(id): Path<String>,
            Json(mut item): Json<$model>,
        ) -> Result<Json<$model>, RestError> {
            state
                .gate
                .authorize(bearer(&headers), $namespace, DataAction::Write)?;
            let existing = state
                .$store_field
                .get(&id)
                .await?
                .ok_or_else(|| RestError(StatusCode::NOT_FOUND, "not_found".to_string()))?;
            if existing.fixed {
                return Err(RestError(StatusCode::FORBIDDEN, "immutable".to_string()));
            }
            item.id = existing.id;
            let affected = state.$store_field.update(&item).await?;
            if affected == 0 {
                return Err(RestError(StatusCode::NOT_FOUND, "not_found".to_string()));
            }
            Ok(Json(item))
        }

        async fn remove(
            State(state): State<AppState>,
            headers: HeaderMap,
            Path(id): Path<String>,
        ) -> Result<StatusCode, RestError> {
            state
                .gate
                .authorize(bearer(&headers), $namespace, DataAction::Delete)?;
            let existing = state
                .$store_field
                .get(&id)
                .await?
                .ok_or_else(|| RestError(StatusCode::NOT_FOUND, "not_found".to_string()))?;
            if existing.fixed {
                return Err(RestError(StatusCode::FORBIDDEN, "immutable".to_string()));
            }
            state.$store_field.delete(&id).await?;
            Ok(StatusCode::NO_CONTENT)
        }
    };
}

mod scopes {
    use super::*;
    entity_router!(scopes_router_impl, "idp.scope", Scope, scope_store);
}
mod roles {
    use super::*;
    entity_router!(roles_router_impl, "idp.role", Role, role_store);
}
mod policies {
    use super::*;
    entity_router!(policies_router_impl, "idp.policy", Policy, policy_store);
}

fn scopes_router() -> Router<AppState> {
    scopes::scopes_router_impl()
}
fn roles_router() -> Router<AppState> {
    roles::roles_router_impl()
}
fn policies_router() -> Router<AppState> {
    policies::policies_router_impl()
}

#[derive(Debug, Deserialize, Validate)]
struct CreateUserRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    name: String,
    #[validate(email(message = "email must be valid"))]
    email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    password: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
}

/// `users` and `clients` get their own handlers rather than the macro: both
/// carry a secret column that needs redaction on the way out.
fn users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/:id",
            get(read_user).patch(update_user).put(update_user).delete(remove_user),
        )
}

async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<User>>, RestError> {
    let claims = state
        .gate
        .authorize(bearer(&headers), "idp.user", DataAction::List)?;
    let full = full_access(&headers, &claims);
    let users = state.user_store.select_all().await?;
    Ok(Json(users.into_iter().map(|u| u.redacted(full)).collect()))
}

async fn read_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<User>, RestError> {
    let claims = state
        .gate
        .authorize(bearer(&headers), "idp.user", DataAction::Read)?;
    let full = full_access(&headers, &claims);
    let user = state
        .user_store
        .get(&id)
        .await?
        .ok_or_else(|| RestError(StatusCode::NOT_FOUND, "not_found".to_string()))?;
    Ok(Json(user.redacted(full)))
}

async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<User>, RestError> {
    state
        .gate
        .authorize(bearer(&headers), "idp.user", DataAction::Write)?;
    req.validate()
        .map_err(|e| RestError(StatusCode::BAD_REQUEST, e.to_string()))?;

    let user = User {
        id: uuid::Uuid::new_v4(),
        name: req.name,
        password: Some(req.password),
        email: req.email,
        full_name: req.full_name,
        roles: req.roles,
    };
    state.user_store.insert(&user).await?;
    Ok(Json(user.redacted(false)))
}

async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<User>, RestError> {
    state
        .gate
        .authorize(bearer(&headers), "idp.user", DataAction::Write)?;
    req.validate()
        .map_err(|e| RestError(StatusCode::BAD_REQUEST, e.to_string()))?;

    let existing = state
        .user_store
        .get(&id)
        .await?
        .ok_or_else(|| RestError(StatusCode::NOT_FOUND, "not_found".to_string()))?;

    let updated = User {
        id: existing.id,
        name: req.name,
        password: Some(req.password),
        email: req.email,
        full_name: req.full_name,
        roles: req.roles,
    };
    let affected = state.user_store.update(&updated).await?;
    if affected == 0 {
        return Err(RestError(StatusCode::NOT_FOUND, "not_found".to_string()));
    }
    Ok(Json(updated.redacted(false)))
}

async fn remove_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, RestError> {
    state
        .gate
        .authorize(bearer(&headers), "idp.user", DataAction::Delete)?;
    state.user_store.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn clients_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_clients).post(create_client))
        .route(
            "/:id",
            get(read_client)
                .patch(update_client)
                .put(update_client)
                .delete(remove_client),
        )
}

async fn list_clients(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<OAuthClient>>, RestError> {
    let claims = state
        .gate
        .authorize(bearer(&headers), "idp.client", DataAction::List)?;
    let full = full_access(&headers, &claims);
    let clients = state.client_store.select_all().await?;
    Ok(Json(clients.into_iter().map(|c| c.redacted(full)).collect()))
}

async fn read_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OAuthClient>, RestError> {
    let claims = state
        .gate
        .authorize(bearer(&headers), "idp.client", DataAction::Read)?;
    let full = full_access(&headers, &claims);
    let client = state
        .client_store
        .get(&id)
        .await?
        .ok_or_else(|| RestError(StatusCode::NOT_FOUND, "not_found".to_string()))?;
    Ok(Json(client.redacted(full)))
}

async fn create_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut client): Json<OAuthClient>,
) -> Result<Json<OAuthClient>, RestError> {
    state
        .gate
        .authorize(bearer(&headers), "idp.client", DataAction::Write)?;
    client.id = uuid::Uuid::new_v4();
    state.client_store.insert(&client).await?;
    Ok(Json(client.redacted(false)))
}

async fn update_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(mut client): Json<OAuthClient>,
) -> Result<Json<OAuthClient>, RestError> {
    state
        .gate
        .authorize(bearer(&headers), "idp.client", DataAction::Write)?;
    let existing = state
        .client_store
        .get(&id)
        .await?
        .ok_or_else(|| RestError(StatusCode::NOT_FOUND, "not_found".to_string()))?;
    client.id = existing.id;
    let affected = state.client_store.update(&client).await?;
    if affected == 0 {
        return Err(RestError(StatusCode::NOT_FOUND, "not_found".to_string()));
    }
    Ok(Json(client.redacted(false)))
}

async fn remove_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, RestError> {
    state
        .gate
        .authorize(bearer(&headers), "idp.client", DataAction::Delete)?;
    state.client_store.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
