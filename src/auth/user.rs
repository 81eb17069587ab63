use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::store::models::{PolicySubject, SubjectKind, User};
use crate::store::UserStore;
use crate::token::{TokenError, TokenService};

#[derive(Debug, Error)]
pub enum UserAuthError {
    #[error("invalid_credential")]
    InvalidCredential,
    #[error(transparent)]
    Token(#[from] TokenError),
}

pub struct AuthenticatedUser {
    pub principal: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// Resolves a user by name or email, checks the password, and mints a token
/// set for the `password` login flow (C7).
#[derive(Clone)]
pub struct UserAuthenticator {
    user_store: UserStore,
    token_service: TokenService,
}

impl UserAuthenticator {
    pub fn new(user_store: UserStore, token_service: TokenService) -> Self {
        UserAuthenticator {
            user_store,
            token_service,
        }
    }

    pub async fn authenticate(
        &self,
        username_or_email: &str,
        password: &str,
        resource_url: Option<&str>,
    ) -> Result<AuthenticatedUser, UserAuthError> {
        let user = self
            .user_store
            .get(username_or_email)
            .await
            .ok()
            .flatten()
            .ok_or(UserAuthError::InvalidCredential)?;

        let stored = user.password.as_deref().unwrap_or_default();
        // Constant-time byte comparison, as recommended — the reference
        // implementation itself does plain byte equality here.
        let matches: bool = stored.as_bytes().ct_eq(password.as_bytes()).into();
        if !matches {
            tracing::warn!(%username_or_email, "password mismatch during login");
            return Err(UserAuthError::InvalidCredential);
        }

        let subject = PolicySubject {
            kind: SubjectKind::User,
            subject: user.name.clone(),
        };

        let token_set = self
            .token_service
            .issue_for(&subject, resource_url, None)
            .await?;

        Ok(AuthenticatedUser {
            principal: user,
            access_token: token_set.access_token,
            refresh_token: token_set.refresh_token,
        })
    }
}
