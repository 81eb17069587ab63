use mini_idp::auth::GRANT_TYPE_DEVICE_CODE;
use mini_idp::device::DeviceFlowError;
use mini_idp::store::models::{OAuthClient, User};
use sqlx::PgPool;
use uuid::Uuid;

mod common;

async fn seed_device_client(services: &common::TestServices) {
    let client = OAuthClient {
        id: Uuid::new_v4(),
        name: "device-client".to_string(),
        secret: None,
        audience: None,
        grant_types: vec![GRANT_TYPE_DEVICE_CODE.to_string()],
        response_types: vec![],
        scopes: vec![],
        extras: serde_json::json!({}),
        description: None,
    };
    services.client_store.insert(&client).await.unwrap();
}

/// The coordinator hardcodes `sub: "user_a"` at initiation time (see
/// DESIGN.md), so exchanging a device code successfully requires that exact
/// user to already exist.
async fn seed_placeholder_user(services: &common::TestServices) {
    let user = User {
        id: Uuid::new_v4(),
        name: "user_a".to_string(),
        password: Some("unused".to_string()),
        email: "user_a@example.com".to_string(),
        full_name: None,
        roles: vec![],
    };
    services.user_store.insert(&user).await.unwrap();
}

#[sqlx::test]
async fn full_device_flow_happy_path(pool: PgPool) {
    let services = common::setup(pool, 1_000).await;
    seed_device_client(&services).await;
    seed_placeholder_user(&services).await;

    let initiation = services
        .device_flow
        .initiate("device-client", "openid offline_access", None, 1_000)
        .await
        .unwrap();

    services
        .device_flow
        .activate(&initiation.user_code, true, 1_010)
        .await
        .unwrap();

    let result = services
        .device_flow
        .exchange("device-client", &initiation.device_code, 1_020)
        .await
        .unwrap();

    assert!(!result.access_token.is_empty());
    assert!(!result.refresh_token.is_empty());
}

#[sqlx::test]
async fn exchange_before_activation_is_pending(pool: PgPool) {
    let services = common::setup(pool, 1_000).await;
    seed_device_client(&services).await;

    let initiation = services
        .device_flow
        .initiate("device-client", "openid", None, 1_000)
        .await
        .unwrap();

    let result = services
        .device_flow
        .exchange("device-client", &initiation.device_code, 1_005)
        .await;

    assert!(matches!(result, Err(DeviceFlowError::State(s)) if s == "authorization_pending"));
}

#[sqlx::test]
async fn activation_with_wrong_user_code_is_rejected(pool: PgPool) {
    let services = common::setup(pool, 1_000).await;
    seed_device_client(&services).await;

    services
        .device_flow
        .initiate("device-client", "openid", None, 1_000)
        .await
        .unwrap();

    let result = services.device_flow.activate("WRONGCODE", true, 1_005).await;
    assert!(matches!(result, Err(DeviceFlowError::ExpiredToken)));
}

#[sqlx::test]
async fn scope_without_a_known_minimum_is_rejected(pool: PgPool) {
    let services = common::setup(pool, 1_000).await;
    seed_device_client(&services).await;

    let result = services
        .device_flow
        .initiate("device-client", "some.other.scope", None, 1_000)
        .await;
    assert!(matches!(result, Err(mini_idp::device::DeviceFlowError::InvalidScope)));
}
