use std::sync::Arc;

use mini_idp::auth::{ClientAuthenticator, UserAuthenticator};
use mini_idp::clock::Clock;
use mini_idp::crypto::Cryptor;
use mini_idp::device::DeviceFlowCoordinator;
use mini_idp::gate::AuthorizationGate;
use mini_idp::kv::KeyValueStore;
use mini_idp::policy::PolicyResolver;
use mini_idp::snapshot::SnapshotAdapter;
use mini_idp::store::{ClientStore, PolicyStore, RoleStore, ScopeStore, UserStore};
use mini_idp::token::TokenService;
use sqlx::PgPool;

pub const SELF_REF: &str = "http://self.test/";

#[allow(dead_code)]
pub struct TestServices {
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

/// Wires every component against a freshly generated RSA keypair and a fixed
/// clock pinned to `at_ts`, mirroring `AppState::build` but over a temp
/// directory instead of the configured key file paths.
pub async fn setup(pool: PgPool, at_ts: i64) -> TestServices {
    let dir = std::env::temp_dir().join(format!("mini-idp-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    generate_test_keys(&dir);

    let clock = Clock::fixed(chrono::DateTime::from_timestamp(at_ts, 0).unwrap());
    let cryptor = Arc::new(Cryptor::from_files(
        dir.join("private.pem").to_str().unwrap(),
        dir.join("public.pem").to_str().unwrap(),
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
        SELF_REF.to_string(),
    );

    let token_service = TokenService::new(
        cryptor.clone(),
        policy_resolver.clone(),
        clock.clone(),
        SELF_REF.to_string(),
        1800,
        43200,
    );

    let client_auth = ClientAuthenticator::new(client_store.clone());
    let user_auth = UserAuthenticator::new(user_store.clone(), token_service.clone());

    let device_flow = DeviceFlowCoordinator::new(
        kv.clone(),
        client_auth.clone(),
        token_service.clone(),
        1800,
        format!("{SELF_REF}oauth"),
    );

    let gate = AuthorizationGate::new(token_service.clone());

    let snapshot = SnapshotAdapter::new(
        scope_store.clone(),
        role_store.clone(),
        user_store.clone(),
        client_store.clone(),
        policy_store.clone(),
    );

    TestServices {
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

fn generate_test_keys(dir: &std::path::Path) {
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
    use rsa::{RsaPrivateKey, RsaPublicKey};

    let mut rng = rand::thread_rng();
    let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
    let public = RsaPublicKey::from(&private);

    std::fs::write(
        dir.join("private.pem"),
        private.to_pkcs8_pem(LineEnding::LF).unwrap().as_bytes(),
    )
    .unwrap();
    std::fs::write(
        dir.join("public.pem"),
        public.to_public_key_pem(LineEnding::LF).unwrap(),
    )
    .unwrap();
}
