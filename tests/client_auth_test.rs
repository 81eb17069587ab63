use mini_idp::auth::{ClientAuthError, GRANT_TYPE_CLIENT_CREDENTIALS, GRANT_TYPE_DEVICE_CODE};
use mini_idp::store::models::OAuthClient;
use sqlx::PgPool;
use uuid::Uuid;

mod common;

fn client(grant_types: &[&str]) -> OAuthClient {
    OAuthClient {
        id: Uuid::new_v4(),
        name: "svc-a".to_string(),
        secret: Some("s3cret".to_string()),
        audience: None,
        grant_types: grant_types.iter().map(|s| s.to_string()).collect(),
        response_types: vec![],
        scopes: vec![],
        extras: serde_json::json!({}),
        description: None,
    }
}

#[sqlx::test]
async fn client_credentials_requires_matching_secret(pool: PgPool) {
    let services = common::setup(pool, 1_000).await;
    services
        .client_store
        .insert(&client(&[GRANT_TYPE_CLIENT_CREDENTIALS]))
        .await
        .unwrap();

    let ok = services
        .client_auth
        .authenticate("svc-a", GRANT_TYPE_CLIENT_CREDENTIALS, Some("s3cret"))
        .await;
    assert!(ok.is_ok());

    let wrong = services
        .client_auth
        .authenticate("svc-a", GRANT_TYPE_CLIENT_CREDENTIALS, Some("nope"))
        .await;
    assert!(matches!(wrong, Err(ClientAuthError::InvalidClient)));
}

#[sqlx::test]
async fn unsupported_grant_type_is_rejected(pool: PgPool) {
    let services = common::setup(pool, 1_000).await;
    services
        .client_store
        .insert(&client(&[GRANT_TYPE_CLIENT_CREDENTIALS]))
        .await
        .unwrap();

    let result = services
        .client_auth
        .authenticate("svc-a", GRANT_TYPE_DEVICE_CODE, None)
        .await;
    assert!(matches!(result, Err(ClientAuthError::UnauthorizedClient)));
}

#[sqlx::test]
async fn unknown_client_is_invalid(pool: PgPool) {
    let services = common::setup(pool, 1_000).await;
    let result = services
        .client_auth
        .authenticate("ghost", GRANT_TYPE_CLIENT_CREDENTIALS, Some("x"))
        .await;
    assert!(matches!(result, Err(ClientAuthError::InvalidClient)));
}
