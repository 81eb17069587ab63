use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::models::{OAuthClient, Policy, Role, Scope, User};
use crate::store::{ClientStore, PolicyStore, RoleStore, ScopeStore, StoreError, UserStore};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unsupported snapshot format")]
    UnsupportedFormat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSnapshot {
    #[serde(default)]
    pub scopes: Vec<Scope>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub clients: Vec<OAuthClient>,
    #[serde(default)]
    pub policies: Vec<Policy>,
}

/// Thin bulk wrapper over the five DAOs (C12): `export` bulk-selects every
/// row, `import` bulk-inserts with `ON CONFLICT DO NOTHING`, one entity kind
/// at a time, independent of one another (a failure in one kind does not
/// roll back another — matching the reference recovery handler).
#[derive(Clone)]
pub struct SnapshotAdapter {
    scope_store: ScopeStore,
    role_store: RoleStore,
    user_store: UserStore,
    client_store: ClientStore,
    policy_store: PolicyStore,
}

impl SnapshotAdapter {
    pub fn new(
        scope_store: ScopeStore,
        role_store: RoleStore,
        user_store: UserStore,
        client_store: ClientStore,
        policy_store: PolicyStore,
    ) -> Self {
        SnapshotAdapter {
            scope_store,
            role_store,
            user_store,
            client_store,
            policy_store,
        }
    }

    pub async fn export(&self) -> Result<AppSnapshot, SnapshotError> {
        Ok(AppSnapshot {
            scopes: self.scope_store.select_all().await?,
            roles: self.role_store.select_all().await?,
            users: self.user_store.select_all().await?,
            clients: self.client_store.select_all().await?,
            policies: self.policy_store.select_all().await?,
        })
    }

    pub async fn import(&self, snapshot: &AppSnapshot) -> Result<(), SnapshotError> {
        for scope in &snapshot.scopes {
            ignore_duplicate(self.scope_store.insert(scope).await)?;
        }
        for role in &snapshot.roles {
            ignore_duplicate(self.role_store.insert(role).await)?;
        }
        for user in &snapshot.users {
            ignore_duplicate(self.user_store.insert(user).await)?;
        }
        for client in &snapshot.clients {
            ignore_duplicate(self.client_store.insert(client).await)?;
        }
        for policy in &snapshot.policies {
            ignore_duplicate(self.policy_store.insert(policy).await)?;
        }
        Ok(())
    }
}

fn ignore_duplicate(result: Result<(), StoreError>) -> Result<(), SnapshotError> {
    match result {
        Ok(()) | Err(StoreError::Duplicate) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
