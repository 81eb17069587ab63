use mini_idp::config::Config;
use sqlx::PgPool;

mod common;

fn test_config(booting_options: &str) -> Config {
    Config {
        database_url: String::new(),
        bind_addr: "0.0.0.0:0".to_string(),
        private_key_file: String::new(),
        public_key_file: String::new(),
        self_ref_uri: common::SELF_REF.to_string(),
        access_token_ttl: 1800,
        refresh_token_ttl: 43200,
        verification_ttl: 1800,
        booting_options: booting_options.to_string(),
        bootstrap_owner_user_name: "root".to_string(),
        bootstrap_owner_email: "root@test.local".to_string(),
        bootstrap_owner_password: "change-me".to_string(),
        bootstrap_owner_id: String::new(),
    }
}

#[sqlx::test]
async fn bootstrap_seeds_predefined_data_exactly_once(pool: PgPool) {
    let services = common::setup(pool.clone(), 1_000).await;
    let cfg = test_config("bootstrap");

    mini_idp::bootstrap::run(&pool, services.cryptor.clone(), &cfg)
        .await
        .unwrap();
    let scopes_after_first = services.scope_store.select_all().await.unwrap().len();
    let roles_after_first = services.role_store.select_all().await.unwrap().len();

    // Running again must not duplicate or error, per the `ON CONFLICT DO
    // NOTHING` idempotence every predefined insert relies on.
    mini_idp::bootstrap::run(&pool, services.cryptor.clone(), &cfg)
        .await
        .unwrap();
    let scopes_after_second = services.scope_store.select_all().await.unwrap().len();
    let roles_after_second = services.role_store.select_all().await.unwrap().len();

    assert_eq!(scopes_after_first, scopes_after_second);
    assert_eq!(roles_after_first, roles_after_second);
    assert!(services.role_store.get("idp.admin").await.unwrap().is_some());

    let root = services.user_store.get("root").await.unwrap().unwrap();
    assert_eq!(root.email, "root@test.local");
}

#[sqlx::test]
async fn data_reset_clears_every_directory_table(pool: PgPool) {
    let services = common::setup(pool.clone(), 1_000).await;
    let cfg = test_config("bootstrap");
    mini_idp::bootstrap::run(&pool, services.cryptor.clone(), &cfg)
        .await
        .unwrap();
    assert!(!services.scope_store.select_all().await.unwrap().is_empty());

    let reset_cfg = test_config("bootstrap:data-reset");
    mini_idp::bootstrap::run(&pool, services.cryptor.clone(), &reset_cfg)
        .await
        .unwrap();

    assert!(services.scope_store.select_all().await.unwrap().is_empty());
    assert!(services.role_store.select_all().await.unwrap().is_empty());
}
