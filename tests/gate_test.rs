use mini_idp::gate::{DataAction, GateError};
use mini_idp::store::models::{OAuthClient, Policy, PolicySubject, SubjectKind};
use sqlx::PgPool;
use uuid::Uuid;

mod common;

#[sqlx::test]
async fn gate_admits_a_request_whose_scopes_are_a_superset_of_required(pool: PgPool) {
    let services = common::setup(pool, 1_000).await;

    let client = OAuthClient {
        id: Uuid::new_v4(),
        name: "admin-client".to_string(),
        secret: Some("s".to_string()),
        audience: None,
        grant_types: vec!["client_credentials".to_string()],
        response_types: vec![],
        scopes: vec![],
        extras: serde_json::json!({}),
        description: None,
    };
    services.client_store.insert(&client).await.unwrap();

    services
        .policy_store
        .insert(&Policy {
            id: Uuid::new_v4(),
            name: "scope-policy".to_string(),
            resource: common::SELF_REF.to_string(),
            subjects: vec![PolicySubject {
                kind: SubjectKind::Client,
                subject: "admin-client".to_string(),
            }],
            scopes: vec!["idp.user.list".to_string(), "idp.user.read".to_string()],
            fixed: false,
        })
        .await
        .unwrap();

    let subject = PolicySubject {
        kind: SubjectKind::Client,
        subject: "admin-client".to_string(),
    };
    let token_set = services
        .token_service
        .issue_for(&subject, None, None)
        .await
        .unwrap();

    let header = format!("Bearer {}", token_set.access_token);
    let claims = services
        .gate
        .authorize(Some(&header), "idp.user", DataAction::List)
        .unwrap();
    assert_eq!(claims.sub, "admin-client");

    let denied = services
        .gate
        .authorize(Some(&header), "idp.user", DataAction::Delete);
    assert!(matches!(denied, Err(GateError::AccessDenied)));
}

#[sqlx::test]
async fn gate_rejects_a_missing_or_malformed_bearer_header(pool: PgPool) {
    let services = common::setup(pool, 1_000).await;
    let result = services.gate.authorize(None, "idp.user", DataAction::Read);
    assert!(matches!(result, Err(GateError::MissingToken)));
}
