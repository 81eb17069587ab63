use sha1::{Digest, Sha1};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{ClientAuthError, ClientAuthenticator, GRANT_TYPE_DEVICE_CODE};
use crate::kv::{KeyValueStore, KvEntry};
use crate::store::models::{PolicySubject, SubjectKind};
use crate::token::{TokenError, TokenService};

const KNOWN_MINIMUM_SCOPES: [&str; 2] = ["openid", "offline_access"];
const STATE_PENDING: &str = "authorization_pending";
const STATE_OK: &str = "ok";
const STATE_DENIED: &str = "access_denied";

#[derive(Debug, Error)]
pub enum DeviceFlowError {
    #[error("invalid_scope")]
    InvalidScope,
    #[error("{0}")]
    ClientAuth(#[from] ClientAuthError),
    #[error("expired_token")]
    ExpiredToken,
    #[error("wrong_user_code")]
    WrongUserCode,
    /// Carries the raw stored state string (`authorization_pending`,
    /// `access_denied`, or anything else observed at exchange time).
    #[error("{0}")]
    State(String),
    #[error(transparent)]
    Token(#[from] TokenError),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DeviceVerificationCodeResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub verification_uri_complete: String,
    pub expires_in: i64,
    pub interval: i64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct DeviceInfo {
    sub: String,
    scopes: Vec<String>,
    resource_url: Option<String>,
}

pub struct TokenExchangeResult {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// The device-code state machine (C8): initiation writes four correlated KV
/// rows in one batch, activation toggles `state`, and exchange reads it back.
/// `info.sub` is hardcoded to `"user_a"` at initiation time, matching the
/// reference implementation exactly — the browser session that later
/// activates the code is never consulted. Preserved deliberately; see
/// DESIGN.md. Likewise the `ok` state is never deleted after a successful
/// exchange, allowing replay until the TTL elapses — also preserved.
#[derive(Clone)]
pub struct DeviceFlowCoordinator {
    kv: KeyValueStore,
    client_auth: ClientAuthenticator,
    token_service: TokenService,
    verification_ttl: i64,
    oauth_base_url: String,
}

impl DeviceFlowCoordinator {
    pub fn new(
        kv: KeyValueStore,
        client_auth: ClientAuthenticator,
        token_service: TokenService,
        verification_ttl: i64,
        oauth_base_url: String,
    ) -> Self {
        DeviceFlowCoordinator {
            kv,
            client_auth,
            token_service,
            verification_ttl,
            oauth_base_url,
        }
    }

    pub async fn initiate(
        &self,
        client_id: &str,
        scope: &str,
        resource: Option<String>,
        now_ts: i64,
    ) -> Result<DeviceVerificationCodeResponse, DeviceFlowError> {
        let requested_scopes: Vec<String> = scope
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let has_minimum = requested_scopes
            .iter()
            .any(|s| KNOWN_MINIMUM_SCOPES.contains(&s.as_str()));
        if !has_minimum {
            return Err(DeviceFlowError::InvalidScope);
        }

        self.client_auth
            .authenticate(client_id, GRANT_TYPE_DEVICE_CODE, None)
            .await?;

        let device_code = Uuid::new_v4().to_string();
        let user_code = derive_user_code(&device_code);
        let expiry_ts = now_ts + self.verification_ttl;

        let info = DeviceInfo {
            // Hardcoded placeholder, matching the reference handler; see DESIGN.md.
            sub: "user_a".to_string(),
            scopes: requested_scopes,
            resource_url: resource,
        };

        self.kv
            .batch_set(&[
                KvEntry::new(
                    format!("user-code:{user_code}/device-code"),
                    serde_json::Value::String(device_code.clone()),
                    Some(expiry_ts),
                ),
                KvEntry::new(
                    format!("device-code:{device_code}/state"),
                    serde_json::Value::String(STATE_PENDING.to_string()),
                    Some(expiry_ts),
                ),
                KvEntry::new(
                    format!("device-code:{device_code}/user-code"),
                    serde_json::Value::String(user_code.clone()),
                    Some(expiry_ts),
                ),
                KvEntry::new(
                    format!("device-code:{device_code}/info"),
                    serde_json::to_value(&info).unwrap(),
                    Some(expiry_ts),
                ),
            ])
            .await
            .map_err(|_| DeviceFlowError::ExpiredToken)?;

        Ok(DeviceVerificationCodeResponse {
            verification_uri: format!("{}/device-activation", self.oauth_base_url),
            verification_uri_complete: format!(
                "{}/device-activation?user_code={}",
                self.oauth_base_url, user_code
            ),
            device_code,
            user_code,
            expires_in: self.verification_ttl,
            interval: 5,
        })
    }

    pub async fn activate(
        &self,
        user_code: &str,
        authorized: bool,
        now_ts: i64,
    ) -> Result<String, DeviceFlowError> {
        let device_code = self
            .kv
            .get(&format!("user-code:{user_code}/device-code"))
            .await
            .ok()
            .flatten()
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or(DeviceFlowError::ExpiredToken)?;

        let expected_user_code = self
            .kv
            .get(&format!("device-code:{device_code}/user-code"))
            .await
            .ok()
            .flatten()
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or(DeviceFlowError::ExpiredToken)?;

        if user_code != expected_user_code {
            // State is left untouched on a wrong code.
            return Err(DeviceFlowError::WrongUserCode);
        }

        let new_state = if authorized { STATE_OK } else { STATE_DENIED };
        let expiry_ts = now_ts + self.verification_ttl;

        self.kv
            .set(
                &format!("device-code:{device_code}/state"),
                serde_json::Value::String(new_state.to_string()),
                Some(expiry_ts),
            )
            .await
            .map_err(|_| DeviceFlowError::ExpiredToken)?;

        Ok(device_code)
    }

    pub async fn exchange(
        &self,
        client_id: &str,
        device_code: &str,
        now_ts: i64,
    ) -> Result<TokenExchangeResult, DeviceFlowError> {
        self.client_auth
            .authenticate(client_id, GRANT_TYPE_DEVICE_CODE, None)
            .await?;

        let state = self
            .kv
            .get(&format!("device-code:{device_code}/state"))
            .await
            .ok()
            .flatten()
            .and_then(|v| v.as_str().map(str::to_string));

        match state.as_deref() {
            Some(STATE_OK) => {
                let info: DeviceInfo = self
                    .kv
                    .get(&format!("device-code:{device_code}/info"))
                    .await
                    .ok()
                    .flatten()
                    .and_then(|v| serde_json::from_value(v).ok())
                    .ok_or(DeviceFlowError::ExpiredToken)?;

                let subject = PolicySubject {
                    kind: SubjectKind::User,
                    subject: info.sub,
                };

                let token_set = self
                    .token_service
                    .issue_for(&subject, info.resource_url.as_deref(), Some(&info.scopes))
                    .await?;

                // Intentionally not deleted after a successful exchange —
                // preserved from the reference implementation; see DESIGN.md.
                Ok(TokenExchangeResult {
                    access_token: token_set.access_token,
                    refresh_token: token_set.refresh_token,
                    expires_in: token_set.access_claims.exp - now_ts,
                })
            }
            Some(other) => Err(DeviceFlowError::State(other.to_string())),
            None => Err(DeviceFlowError::ExpiredToken),
        }
    }
}

fn derive_user_code(device_code: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(device_code.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..8].to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_code_is_eight_uppercase_hex_chars() {
        let code = derive_user_code("11111111-1111-1111-1111-111111111111");
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn user_code_is_deterministic() {
        assert_eq!(derive_user_code("abc"), derive_user_code("abc"));
        assert_ne!(derive_user_code("abc"), derive_user_code("abd"));
    }
}
