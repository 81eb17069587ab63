use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Clock;
use crate::crypto::{Cryptor, CryptoError};
use crate::policy::{PolicyResolver, ResolverError};
use crate::store::models::PolicySubject;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("invalid-token")]
    InvalidToken,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    pub sub: String,
    pub psl: Vec<String>,
    pub scope: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshClaims {
    pub sub: String,
    pub scope: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_claims: AccessClaims,
    pub access_token: String,
    pub refresh_claims: RefreshClaims,
    pub refresh_token: String,
}

/// Issues and parses the RS256 access/refresh token pair, deriving the
/// granted scope set from [`PolicyResolver`] and signing through [`Cryptor`].
#[derive(Clone)]
pub struct TokenService {
    cryptor: Arc<Cryptor>,
    resolver: PolicyResolver,
    clock: Clock,
    self_reference_uri: String,
    access_token_ttl: i64,
    refresh_token_ttl: i64,
}

impl TokenService {
    pub fn new(
        cryptor: Arc<Cryptor>,
        resolver: PolicyResolver,
        clock: Clock,
        self_reference_uri: String,
        access_token_ttl: i64,
        refresh_token_ttl: i64,
    ) -> Self {
        TokenService {
            cryptor,
            resolver,
            clock,
            self_reference_uri,
            access_token_ttl,
            refresh_token_ttl,
        }
    }

    pub async fn issue_for(
        &self,
        subject: &PolicySubject,
        resource_url: Option<&str>,
        requested_scopes: Option<&[String]>,
    ) -> Result<TokenSet, TokenError> {
        let resource_url = resource_url
            .map(str::to_string)
            .unwrap_or_else(|| self.self_reference_uri.clone());

        let resolution = self
            .resolver
            .evaluate(
                std::slice::from_ref(subject),
                Some(&resource_url),
                requested_scopes,
            )
            .await?;

        let granted = resolution.granted_scopes();
        let now = self.clock.now_ts();

        let access_claims = AccessClaims {
            sub: subject.subject.clone(),
            psl: resolution.subjects.clone(),
            scope: granted.join(" "),
            iss: self.self_reference_uri.clone(),
            aud: resource_url.clone(),
            exp: now + self.access_token_ttl,
        };

        let refresh_claims = RefreshClaims {
            sub: subject.subject.clone(),
            scope: "openid refresh".to_string(),
            iss: self.self_reference_uri.clone(),
            aud: resource_url,
            exp: now + self.refresh_token_ttl,
        };

        let access_token = self.cryptor.encode(&access_claims)?;
        let refresh_token = self.cryptor.encode(&refresh_claims)?;

        Ok(TokenSet {
            access_claims,
            access_token,
            refresh_claims,
            refresh_token,
        })
    }

    pub fn parse(
        &self,
        token: &str,
        expected_aud: Option<&str>,
    ) -> Result<AccessClaims, TokenError> {
        let aud = expected_aud.unwrap_or(&self.self_reference_uri);
        self.cryptor
            .decode::<AccessClaims>(token, Some(&self.self_reference_uri), Some(aud))
            .map_err(|_| TokenError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_claims_round_trip_via_serde() {
        let claims = AccessClaims {
            sub: "user_a".into(),
            psl: vec!["User/user_a".into()],
            scope: "idp.user.read".into(),
            iss: "http://self/".into(),
            aud: "http://self/".into(),
            exp: 1_700_000_000,
        };
        let json = serde_json::to_string(&claims).unwrap();
        let back: AccessClaims = serde_json::from_str(&json).unwrap();
        assert_eq!(claims, back);
    }
}
