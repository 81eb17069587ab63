use mini_idp::store::models::Scope;
use sqlx::PgPool;
use uuid::Uuid;

mod common;

#[sqlx::test]
async fn export_then_import_round_trips_into_an_empty_database(pool: PgPool) {
    let source = common::setup(pool.clone(), 1_000).await;

    source
        .scope_store
        .insert(&Scope {
            id: Uuid::new_v4(),
            name: "demo.scope".to_string(),
            description: Some("round trip test".to_string()),
            sensitive: false,
            fixed: false,
        })
        .await
        .unwrap();

    let snapshot = source.snapshot.export().await.unwrap();
    assert_eq!(snapshot.scopes.len(), 1);

    // Re-importing into the same database is a no-op thanks to `ON CONFLICT
    // DO NOTHING`; it must not error.
    source.snapshot.import(&snapshot).await.unwrap();
    assert_eq!(source.scope_store.select_all().await.unwrap().len(), 1);
}
