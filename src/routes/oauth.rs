use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use tower_cookies::{
    cookie::time::Duration as CookieDuration, cookie::SameSite, Cookie, Cookies,
};

use crate::auth::{ClientAuthError, GRANT_TYPE_CLIENT_CREDENTIALS, GRANT_TYPE_DEVICE_CODE};
use crate::device::DeviceFlowError;
use crate::middleware::session::{self, SESSION_COOKIE};
use crate::state::AppState;
use crate::store::models::{PolicySubject, SubjectKind};

/// Routes mirroring the reference `/oauth/*` surface: session-cookie login
/// plus the two token-issuing grants (client-credentials and device-code).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/session", post(session_status))
        .route("/device", post(initiate_device))
        .route("/device-activation", get(device_activation_page).post(confirm_device_activation))
        .route("/token", post(token))
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

async fn login_page() -> impl IntoResponse {
    axum::response::Html(LOGIN_PAGE_HTML)
}

/// POST /oauth/login — authenticates against `UserStore` and, on success,
/// sets a session cookie pointing at an opaque session id stored in the KV
/// store (ambient session bridge; not present verbatim upstream, added so the
/// HTML login surface has somewhere to put the resulting token pair).
async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> Result<Json<LoginResponse>, OAuthErrorResponse> {
    let authenticated = state
        .user_auth
        .authenticate(&form.username, &form.password, None)
        .await
        .map_err(|_| OAuthErrorResponse::new(StatusCode::UNAUTHORIZED, "invalid_grant"))?;

    let session_id = uuid::Uuid::new_v4().to_string();
    let now = state.clock.now_ts();
    state
        .kv
        .set(
            &format!("session:{session_id}"),
            serde_json::json!({
                "sub": authenticated.principal.name,
                "access_token": authenticated.access_token,
                "refresh_token": authenticated.refresh_token,
            }),
            Some(now + state.config.refresh_token_ttl),
        )
        .await
        .map_err(|_| OAuthErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "server_error"))?;

    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(cfg!(not(debug_assertions)))
        .max_age(CookieDuration::seconds(state.config.refresh_token_ttl))
        .build();
    cookies.add(cookie);

    Ok(Json(LoginResponse {
        access_token: authenticated.access_token,
        refresh_token: authenticated.refresh_token,
    }))
}

async fn logout(State(state): State<AppState>, cookies: Cookies) -> impl IntoResponse {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        let _ = state.kv.delete(&format!("session:{}", cookie.value())).await;
    }
    cookies.remove(Cookie::new(SESSION_COOKIE, ""));
    StatusCode::NO_CONTENT
}

#[derive(Debug, Serialize)]
struct SessionStatus {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
}

/// POST /oauth/session — used by the device-activation page to check whether
/// the browser already carries an authenticated session before asking the
/// visitor to sign in.
async fn session_status(State(state): State<AppState>, cookies: Cookies) -> impl IntoResponse {
    match session::load(&state, &cookies).await {
        Some(record) => Json(SessionStatus {
            authenticated: true,
            sub: Some(record.sub),
        }),
        None => Json(SessionStatus {
            authenticated: false,
            sub: None,
        }),
    }
}

#[derive(Debug, Deserialize)]
struct DeviceAuthorizationRequest {
    client_id: String,
    scope: String,
    #[serde(default)]
    resource: Option<String>,
}

async fn initiate_device(
    State(state): State<AppState>,
    Form(req): Form<DeviceAuthorizationRequest>,
) -> Result<impl IntoResponse, OAuthErrorResponse> {
    let now = state.clock.now_ts();
    let response = state
        .device_flow
        .initiate(&req.client_id, &req.scope, req.resource, now)
        .await
        .map_err(OAuthErrorResponse::from)?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct DeviceActivationQuery {
    #[serde(default)]
    user_code: Option<String>,
}

async fn device_activation_page(Query(q): Query<DeviceActivationQuery>) -> impl IntoResponse {
    let prefilled = q.user_code.unwrap_or_default();
    axum::response::Html(device_activation_html(&prefilled))
}

#[derive(Debug, Deserialize)]
struct DeviceActivationForm {
    user_code: String,
    #[serde(default)]
    deny: bool,
}

#[derive(Debug, Serialize)]
struct DeviceActivationResponse {
    device_code: String,
}

async fn confirm_device_activation(
    State(state): State<AppState>,
    Json(form): Json<DeviceActivationForm>,
) -> Result<Json<DeviceActivationResponse>, OAuthErrorResponse> {
    let now = state.clock.now_ts();
    let device_code = state
        .device_flow
        .activate(&form.user_code, !form.deny, now)
        .await
        .map_err(OAuthErrorResponse::from)?;
    Ok(Json(DeviceActivationResponse { device_code }))
}

#[derive(Debug, Deserialize)]
struct TokenRequest {
    grant_type: String,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    device_code: Option<String>,
    #[serde(default)]
    resource: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    token_type: &'static str,
    expires_in: i64,
}

/// POST /oauth/token — dispatches on `grant_type`. Only the two grants named
/// in C6/C8 are supported; anything else is `unsupported_grant_type`.
async fn token(
    State(state): State<AppState>,
    Form(req): Form<TokenRequest>,
) -> Result<Json<TokenResponse>, OAuthErrorResponse> {
    match req.grant_type.as_str() {
        GRANT_TYPE_CLIENT_CREDENTIALS => {
            let client_id = req
                .client_id
                .ok_or_else(|| OAuthErrorResponse::new(StatusCode::BAD_REQUEST, "invalid_request"))?;

            let client = state
                .client_auth
                .authenticate(
                    &client_id,
                    GRANT_TYPE_CLIENT_CREDENTIALS,
                    req.client_secret.as_deref(),
                )
                .await
                .map_err(OAuthErrorResponse::from)?;

            let requested: Option<Vec<String>> = req
                .scope
                .as_deref()
                .map(|s| s.split_whitespace().map(str::to_string).collect());

            let subject = PolicySubject {
                kind: SubjectKind::Client,
                subject: client.name,
            };

            let now = state.clock.now_ts();
            let token_set = state
                .token_service
                .issue_for(&subject, req.resource.as_deref(), requested.as_deref())
                .await
                .map_err(|_| OAuthErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "server_error"))?;

            Ok(Json(TokenResponse {
                expires_in: token_set.access_claims.exp - now,
                access_token: token_set.access_token,
                refresh_token: token_set.refresh_token,
                token_type: "Bearer",
            }))
        }
        GRANT_TYPE_DEVICE_CODE => {
            let client_id = req
                .client_id
                .ok_or_else(|| OAuthErrorResponse::new(StatusCode::BAD_REQUEST, "invalid_request"))?;
            let device_code = req
                .device_code
                .ok_or_else(|| OAuthErrorResponse::new(StatusCode::BAD_REQUEST, "invalid_request"))?;

            let now = state.clock.now_ts();
            let result = state
                .device_flow
                .exchange(&client_id, &device_code, now)
                .await
                .map_err(OAuthErrorResponse::from)?;

            Ok(Json(TokenResponse {
                access_token: result.access_token,
                refresh_token: result.refresh_token,
                token_type: "Bearer",
                expires_in: result.expires_in,
            }))
        }
        _ => Err(OAuthErrorResponse::new(
            StatusCode::BAD_REQUEST,
            "unsupported_grant_type",
        )),
    }
}

/// Wire-format OAuth error body (`{"error": "..."}`), used across every
/// `/oauth/*` handler instead of a bespoke error enum per endpoint.
pub struct OAuthErrorResponse {
    status: StatusCode,
    code: &'static str,
}

impl OAuthErrorResponse {
    fn new(status: StatusCode, code: &'static str) -> Self {
        OAuthErrorResponse { status, code }
    }
}

impl From<ClientAuthError> for OAuthErrorResponse {
    fn from(e: ClientAuthError) -> Self {
        let status = match e {
            ClientAuthError::InvalidClient => StatusCode::UNAUTHORIZED,
            ClientAuthError::UnauthorizedClient => StatusCode::BAD_REQUEST,
        };
        OAuthErrorResponse::new(status, e.wire_code())
    }
}

impl From<DeviceFlowError> for OAuthErrorResponse {
    fn from(e: DeviceFlowError) -> Self {
        let status = match &e {
            DeviceFlowError::InvalidScope => StatusCode::BAD_REQUEST,
            DeviceFlowError::ClientAuth(inner) => return OAuthErrorResponse::from(*inner),
            DeviceFlowError::ExpiredToken => StatusCode::BAD_REQUEST,
            DeviceFlowError::WrongUserCode => StatusCode::BAD_REQUEST,
            DeviceFlowError::State(_) => StatusCode::BAD_REQUEST,
            DeviceFlowError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let code: &'static str = match &e {
            DeviceFlowError::InvalidScope => "invalid_scope",
            DeviceFlowError::ExpiredToken => "expired_token",
            DeviceFlowError::WrongUserCode => "wrong_user_code",
            DeviceFlowError::State(s) if s.as_str() == "authorization_pending" => {
                "authorization_pending"
            }
            DeviceFlowError::State(s) if s.as_str() == "access_denied" => "access_denied",
            DeviceFlowError::State(_) => "invalid_grant",
            DeviceFlowError::Token(_) => "server_error",
            DeviceFlowError::ClientAuth(_) => unreachable!(),
        };
        OAuthErrorResponse::new(status, code)
    }
}

impl IntoResponse for OAuthErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.code }))).into_response()
    }
}

const LOGIN_PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Sign in</title></head>
<body>
  <h1>Sign in</h1>
  <form id="login-form">
    <label>Username or email <input name="username" type="text" required></label><br>
    <label>Password <input name="password" type="password" required></label><br>
    <button type="submit">Sign in</button>
  </form>
  <script>
    document.getElementById('login-form').addEventListener('submit', async (e) => {
      e.preventDefault();
      const body = new URLSearchParams(new FormData(e.target));
      const res = await fetch('/oauth/login', {
        method: 'POST',
        headers: { 'content-type': 'application/x-www-form-urlencoded' },
        body,
      });
      document.body.dataset.loginOk = res.ok;
    });
  </script>
</body>
</html>"#;

fn device_activation_html(prefilled_user_code: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Device activation</title></head>
<body>
  <h1>Activate device</h1>
  <form id="activation-form">
    <label>Code <input name="user_code" type="text" value="{prefilled_user_code}" required></label><br>
    <button type="submit" name="deny" value="false">Allow</button>
    <button type="submit" name="deny" value="true">Deny</button>
  </form>
</body>
</html>"#
    )
}
