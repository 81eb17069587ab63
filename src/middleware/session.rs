use serde::Deserialize;
use tower_cookies::Cookies;

use crate::state::AppState;

pub const SESSION_COOKIE: &str = "mini_idp_session";

#[derive(Debug, Clone, Deserialize)]
pub struct SessionRecord {
    pub sub: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// Looks up the session cookie against the KV-backed `session:<id>` entry
/// written by `routes::oauth::login`. Returns `None` for an absent or expired
/// cookie rather than an error — callers treat it the same as "not logged in".
pub async fn load(state: &AppState, cookies: &Cookies) -> Option<SessionRecord> {
    let session_id = cookies.get(SESSION_COOKIE)?.value().to_string();
    let value = state
        .kv
        .get(&format!("session:{session_id}"))
        .await
        .ok()??;
    serde_json::from_value(value).ok()
}
