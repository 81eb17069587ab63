use std::collections::HashSet;

use thiserror::Error;

use crate::token::{AccessClaims, TokenService};

const MIN_TOKEN_LENGTH: usize = 20;
const PRIVILEGED_SCOPES: [&str; 2] = ["idp.root", "idp.admin"];

#[derive(Debug, Error)]
pub enum GateError {
    #[error("missing-token")]
    MissingToken,
    #[error("invalid-token")]
    InvalidToken,
    #[error("access.denied")]
    AccessDenied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataAction {
    List,
    Read,
    Write,
    Delete,
}

impl DataAction {
    fn as_str(&self) -> &'static str {
        match self {
            DataAction::List => "list",
            DataAction::Read => "read",
            DataAction::Write => "write",
            DataAction::Delete => "delete",
        }
    }
}

fn granted_scopes(claims: &AccessClaims) -> HashSet<&str> {
    claims
        .scope
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .collect()
}

/// Extracts the bearer token, parses its claims, and admits the request when
/// the required scopes are a subset of the granted ones (C9). The source
/// this is modeled on has a stray branch computing `matched.len() ==
/// given.len()` — a different, buggy predicate — which is deliberately NOT
/// reproduced here; see DESIGN.md Open Question #4.
#[derive(Clone)]
pub struct AuthorizationGate {
    token_service: TokenService,
}

impl AuthorizationGate {
    pub fn new(token_service: TokenService) -> Self {
        AuthorizationGate { token_service }
    }

    pub fn extract_bearer(header_value: Option<&str>) -> Result<&str, GateError> {
        let header = header_value.ok_or(GateError::MissingToken)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(GateError::MissingToken)?;
        if token.len() < MIN_TOKEN_LENGTH {
            return Err(GateError::MissingToken);
        }
        Ok(token)
    }

    pub fn authorize(
        &self,
        authorization_header: Option<&str>,
        namespace: &str,
        action: DataAction,
    ) -> Result<AccessClaims, GateError> {
        let token = Self::extract_bearer(authorization_header)?;
        let claims = self
            .token_service
            .parse(token, None)
            .map_err(|_| GateError::InvalidToken)?;

        let required = format!("{namespace}.{}", action.as_str());
        let granted = granted_scopes(&claims);

        if PRIVILEGED_SCOPES.iter().any(|s| granted.contains(s)) {
            return Ok(claims);
        }

        // required ⊆ given, preserved as the intended predicate.
        if granted.contains(required.as_str()) {
            Ok(claims)
        } else {
            Err(GateError::AccessDenied)
        }
    }

    pub fn has_full_access(claims: &AccessClaims, access_level_header: Option<&str>) -> bool {
        let requested_full = access_level_header == Some("full");
        let granted = granted_scopes(claims);
        requested_full && PRIVILEGED_SCOPES.iter().any(|s| granted.contains(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_with_scope(scope: &str) -> AccessClaims {
        AccessClaims {
            sub: "svc1".into(),
            psl: vec![],
            scope: scope.into(),
            iss: "http://self/".into(),
            aud: "http://self/".into(),
            exp: 9_999_999_999,
        }
    }

    #[test]
    fn subset_predicate_admits_when_required_is_subset_of_given() {
        let claims = claims_with_scope("idp.user.list idp.role.list");
        let granted = granted_scopes(&claims);
        assert!(granted.contains("idp.user.list"));
    }

    #[test]
    fn privileged_scope_always_admits() {
        let claims = claims_with_scope("idp.admin");
        let granted = granted_scopes(&claims);
        assert!(PRIVILEGED_SCOPES.iter().any(|s| granted.contains(s)));
    }

    #[test]
    fn full_access_requires_both_header_and_privileged_scope() {
        let claims = claims_with_scope("idp.admin");
        assert!(AuthorizationGate::has_full_access(&claims, Some("full")));
        assert!(!AuthorizationGate::has_full_access(&claims, None));

        let unprivileged = claims_with_scope("idp.user.list");
        assert!(!AuthorizationGate::has_full_access(&unprivileged, Some("full")));
    }

    #[test]
    fn bearer_extraction_enforces_minimum_length() {
        assert!(AuthorizationGate::extract_bearer(Some("Bearer short")).is_err());
        assert!(AuthorizationGate::extract_bearer(None).is_err());
        assert!(AuthorizationGate::extract_bearer(Some("Bearer 01234567890123456789")).is_ok());
    }
}
