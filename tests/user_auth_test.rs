use mini_idp::auth::UserAuthError;
use mini_idp::store::models::User;
use sqlx::PgPool;
use uuid::Uuid;

mod common;

#[sqlx::test]
async fn login_succeeds_with_correct_password_and_fails_with_wrong_one(pool: PgPool) {
    let services = common::setup(pool, 1_000).await;

    let user = User {
        id: Uuid::new_v4(),
        name: "bob".to_string(),
        password: Some("hunter2".to_string()),
        email: "bob@example.com".to_string(),
        full_name: Some("Bob".to_string()),
        roles: vec![],
    };
    services.user_store.insert(&user).await.unwrap();

    let ok = services.user_auth.authenticate("bob", "hunter2", None).await;
    assert!(ok.is_ok());

    let ok_by_email = services
        .user_auth
        .authenticate("bob@example.com", "hunter2", None)
        .await;
    assert!(ok_by_email.is_ok());

    let wrong = services.user_auth.authenticate("bob", "wrong", None).await;
    assert!(matches!(wrong, Err(UserAuthError::InvalidCredential)));
}

#[sqlx::test]
async fn unknown_username_is_rejected(pool: PgPool) {
    let services = common::setup(pool, 1_000).await;
    let result = services.user_auth.authenticate("ghost", "anything", None).await;
    assert!(matches!(result, Err(UserAuthError::InvalidCredential)));
}
