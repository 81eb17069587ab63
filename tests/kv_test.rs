use sqlx::PgPool;

mod common;

#[sqlx::test]
async fn set_then_get_round_trips(pool: PgPool) {
    let services = common::setup(pool, 1_000).await;

    services
        .kv
        .set("greeting", serde_json::json!("hello"), None)
        .await
        .unwrap();

    let value = services.kv.get("greeting").await.unwrap();
    assert_eq!(value, Some(serde_json::json!("hello")));
}

#[sqlx::test]
async fn expired_entry_is_not_returned(pool: PgPool) {
    let services = common::setup(pool, 1_000).await;

    services
        .kv
        .set("ephemeral", serde_json::json!(1), Some(500))
        .await
        .unwrap();

    assert_eq!(services.kv.get("ephemeral").await.unwrap(), None);
}

#[sqlx::test]
async fn batch_set_upserts_every_entry_atomically(pool: PgPool) {
    use mini_idp::kv::KvEntry;

    let services = common::setup(pool, 1_000).await;

    services
        .kv
        .batch_set(&[
            KvEntry::new("a", serde_json::json!(1), None),
            KvEntry::new("b", serde_json::json!(2), None),
        ])
        .await
        .unwrap();

    assert_eq!(services.kv.get("a").await.unwrap(), Some(serde_json::json!(1)));
    assert_eq!(services.kv.get("b").await.unwrap(), Some(serde_json::json!(2)));

    services
        .kv
        .batch_set(&[KvEntry::new("a", serde_json::json!(99), None)])
        .await
        .unwrap();
    assert_eq!(services.kv.get("a").await.unwrap(), Some(serde_json::json!(99)));
}
