use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::{ClientAuthenticator, UserAuthenticator};
use crate::clock::Clock;
use crate::config::Config;
use crate::crypto::Cryptor;
use crate::device::DeviceFlowCoordinator;
use crate::gate::AuthorizationGate;
use crate::kv::KeyValueStore;
use crate::policy::PolicyResolver;
use crate::snapshot::SnapshotAdapter;
use crate::store::{ClientStore, PolicyStore, RoleStore, ScopeStore, UserStore};
use crate::token::TokenService;

/// The composition root's wiring, shared across every axum handler. Built
/// once in `main` in dependency order (C11, C2, C1, C3s, C4, C5, C6, C7, C8,
/// C9) and cloned cheaply per request — every field is an `Arc`/pool clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: PgPool,
    pub clock: Clock,
    pub cryptor: Arc<Cryptor>,

    pub kv: KeyValueStore,
    pub scope_store: ScopeStore,
    pub role_store: RoleStore,
    pub user_store: UserStore,
    pub client_store: ClientStore,
    pub policy_store: PolicyStore,

    pub policy_resolver: PolicyResolver,
    pub token_service: TokenService,
    pub client_auth: ClientAuthenticator,
    pub user_auth: UserAuthenticator,
    pub device_flow: DeviceFlowCoordinator,
    pub gate: AuthorizationGate,
    pub snapshot: SnapshotAdapter,
}

impl AppState {
    pub fn build(pool: PgPool, config: Config) -> Self {
        let config = Arc::new(config);
        let clock = Clock::wall();
        let cryptor = Arc::new(Cryptor::from_files(
            &config.private_key_file,
            &config.public_key_file,
        ));

        let kv = KeyValueStore::new(pool.clone(), clock.clone());
        let scope_store = ScopeStore::new(pool.clone());
        let role_store = RoleStore::new(pool.clone());
        let user_store = UserStore::new(pool.clone(), cryptor.clone());
        let client_store = ClientStore::new(pool.clone(), cryptor.clone());
        let policy_store = PolicyStore::new(pool.clone());

        let policy_resolver = PolicyResolver::new(
            client_store.clone(),
            role_store.clone(),
            user_store.clone(),
            policy_store.clone(),
            config.self_ref_uri.clone(),
        );

        let token_service = TokenService::new(
            cryptor.clone(),
            policy_resolver.clone(),
            clock.clone(),
            config.self_ref_uri.clone(),
            config.access_token_ttl,
            config.refresh_token_ttl,
        );

        let client_auth = ClientAuthenticator::new(client_store.clone());
        let user_auth = UserAuthenticator::new(user_store.clone(), token_service.clone());

        let oauth_base_url = format!("{}oauth", config.self_ref_uri.trim_end_matches('/'));
        let device_flow = DeviceFlowCoordinator::new(
            kv.clone(),
            client_auth.clone(),
            token_service.clone(),
            config.verification_ttl,
            oauth_base_url,
        );

        let gate = AuthorizationGate::new(token_service.clone());

        let snapshot = SnapshotAdapter::new(
            scope_store.clone(),
            role_store.clone(),
            user_store.clone(),
            client_store.clone(),
            policy_store.clone(),
        );

        AppState {
            config,
            pool,
            clock,
            cryptor,
            kv,
            scope_store,
            role_store,
            user_store,
            client_store,
            policy_store,
            policy_resolver,
            token_service,
            client_auth,
            user_auth,
            device_flow,
            gate,
            snapshot,
        }
    }
}
