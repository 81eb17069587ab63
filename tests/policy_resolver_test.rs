use mini_idp::store::models::{Policy, PolicySubject, Role, SubjectKind, User};
use sqlx::PgPool;
use uuid::Uuid;

mod common;

#[sqlx::test]
async fn user_inherits_role_scopes_and_is_matched_by_email(pool: PgPool) {
    let services = common::setup(pool, 1_000).await;

    let role = Role {
        id: Uuid::new_v4(),
        name: "editor".to_string(),
        description: None,
        fixed: false,
    };
    services.role_store.insert(&role).await.unwrap();

    let user = User {
        id: Uuid::new_v4(),
        name: "alice".to_string(),
        password: Some("pw".to_string()),
        email: "alice@example.com".to_string(),
        full_name: None,
        roles: vec!["editor".to_string()],
    };
    services.user_store.insert(&user).await.unwrap();

    let policy = Policy {
        id: Uuid::new_v4(),
        name: "editor-policy".to_string(),
        resource: common::SELF_REF.to_string(),
        subjects: vec![
            PolicySubject {
                kind: SubjectKind::Role,
                subject: "editor".to_string(),
            },
            PolicySubject {
                kind: SubjectKind::User,
                subject: "alice@example.com".to_string(),
            },
        ],
        scopes: vec!["idp.user.read".to_string(), "idp.user.write".to_string()],
        fixed: false,
    };
    services.policy_store.insert(&policy).await.unwrap();

    let subject = PolicySubject {
        kind: SubjectKind::User,
        subject: "alice".to_string(),
    };
    let resolution = services
        .policy_resolver
        .evaluate(std::slice::from_ref(&subject), None, None)
        .await
        .unwrap();

    assert_eq!(
        resolution.granted_scopes(),
        vec!["idp.user.read".to_string(), "idp.user.write".to_string()]
    );
    assert!(resolution.subjects.contains(&"User/alice".to_string()));
    assert!(resolution.subjects.contains(&"Role/editor".to_string()));
}

#[sqlx::test]
async fn requested_scopes_filter_out_policies_that_lack_them(pool: PgPool) {
    let services = common::setup(pool, 1_000).await;

    let role = Role {
        id: Uuid::new_v4(),
        name: "reader".to_string(),
        description: None,
        fixed: false,
    };
    services.role_store.insert(&role).await.unwrap();

    let policy = Policy {
        id: Uuid::new_v4(),
        name: "reader-policy".to_string(),
        resource: common::SELF_REF.to_string(),
        subjects: vec![PolicySubject {
            kind: SubjectKind::Role,
            subject: "reader".to_string(),
        }],
        scopes: vec!["idp.user.read".to_string()],
        fixed: false,
    };
    services.policy_store.insert(&policy).await.unwrap();

    let subject = PolicySubject {
        kind: SubjectKind::Role,
        subject: "reader".to_string(),
    };

    let requested = vec!["idp.user.write".to_string()];
    let resolution = services
        .policy_resolver
        .evaluate(std::slice::from_ref(&subject), None, Some(&requested))
        .await
        .unwrap();

    assert!(resolution.policies.is_empty());
}
