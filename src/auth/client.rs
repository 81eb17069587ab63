use thiserror::Error;

use crate::store::models::OAuthClient;
use crate::store::{ClientStore, StoreError};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuthError {
    #[error("invalid_client")]
    InvalidClient,
    #[error("unauthorized_client")]
    UnauthorizedClient,
}

impl ClientAuthError {
    pub fn wire_code(&self) -> &'static str {
        match self {
            ClientAuthError::InvalidClient => "invalid_client",
            ClientAuthError::UnauthorizedClient => "unauthorized_client",
        }
    }
}

pub const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";
pub const GRANT_TYPE_DEVICE_CODE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Validates client identity and the requested grant type (C6).
#[derive(Clone)]
pub struct ClientAuthenticator {
    client_store: ClientStore,
}

impl ClientAuthenticator {
    pub fn new(client_store: ClientStore) -> Self {
        ClientAuthenticator { client_store }
    }

    pub async fn authenticate(
        &self,
        client_id: &str,
        grant_type: &str,
        client_secret: Option<&str>,
    ) -> Result<OAuthClient, ClientAuthError> {
        let client = match self.client_store.get(client_id).await {
            Ok(Some(client)) => client,
            Ok(None) => {
                tracing::warn!(%client_id, "unable to find client for any grant type");
                return Err(ClientAuthError::InvalidClient);
            }
            Err(StoreError::Sql(e)) => {
                tracing::error!(error = %e, "store error while authenticating client");
                return Err(ClientAuthError::InvalidClient);
            }
            Err(_) => return Err(ClientAuthError::InvalidClient),
        };

        if grant_type == GRANT_TYPE_CLIENT_CREDENTIALS {
            let secret_matches = client.secret.as_deref() == client_secret;
            if client.name != client_id || !secret_matches {
                tracing::warn!(%client_id, "found client but secret is mismatched");
                return Err(ClientAuthError::InvalidClient);
            }
        }

        if !client.grant_types.iter().any(|g| g == grant_type) {
            tracing::warn!(%client_id, %grant_type, "client does not support this grant type");
            return Err(ClientAuthError::UnauthorizedClient);
        }

        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_match_taxonomy() {
        assert_eq!(ClientAuthError::InvalidClient.wire_code(), "invalid_client");
        assert_eq!(
            ClientAuthError::UnauthorizedClient.wire_code(),
            "unauthorized_client"
        );
    }
}
