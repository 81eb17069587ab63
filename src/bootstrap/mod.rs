pub mod seed;

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::crypto::{Cryptor, CryptoError};
use crate::store::models::{Policy, Role, Scope};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

const BOOTSTRAP: &str = "bootstrap";
const DATA_RESET: &str = "bootstrap:data-reset";
const SESSION_RESET: &str = "bootstrap:session-reset";

/// Idempotent predefined scopes/roles/policies/root user, plus the optional
/// destructive resets (C10). Runs once at startup when `MINI_IDP_BOOTING_OPTIONS`
/// names `bootstrap`. The seed itself runs inside one transaction so a
/// failure partway through never leaves the directory half-seeded.
pub async fn run(
    pool: &PgPool,
    cryptor: Arc<Cryptor>,
    config: &Config,
) -> Result<(), BootstrapError> {
    let options = config.booting_options();

    if options.contains(&DATA_RESET) {
        data_reset(pool).await?;
    }
    if options.contains(&SESSION_RESET) {
        sqlx::query("DELETE FROM kv").execute(pool).await?;
    }

    if !options.contains(&BOOTSTRAP) {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    for scope in seed::predefined_scopes() {
        insert_scope(&mut tx, &scope).await?;
    }
    for role in seed::predefined_roles() {
        insert_role(&mut tx, &role).await?;
    }
    for policy in seed::predefined_policies(&config.self_ref_uri) {
        insert_policy(&mut tx, &policy).await?;
    }

    let root_id = if config.bootstrap_owner_id.is_empty() {
        Uuid::new_v4()
    } else {
        Uuid::parse_str(&config.bootstrap_owner_id).unwrap_or_else(|_| Uuid::new_v4())
    };

    let password = cryptor.encrypt(config.bootstrap_owner_password.as_bytes())?;
    sqlx::query(
        "INSERT INTO users (id, name, password, email, full_name, roles) VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT DO NOTHING",
    )
    .bind(root_id)
    .bind(&config.bootstrap_owner_user_name)
    .bind(password)
    .bind(&config.bootstrap_owner_email)
    .bind("Root")
    .bind(serde_json::json!(["idp.admin"]))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

async fn insert_scope(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    scope: &Scope,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO scopes (id, name, description, sensitive, fixed) VALUES ($1, $2, $3, $4, $5) ON CONFLICT DO NOTHING",
    )
    .bind(scope.id)
    .bind(&scope.name)
    .bind(&scope.description)
    .bind(scope.sensitive)
    .bind(scope.fixed)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_role(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    role: &Role,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO roles (id, name, description, fixed) VALUES ($1, $2, $3, $4) ON CONFLICT DO NOTHING",
    )
    .bind(role.id)
    .bind(&role.name)
    .bind(&role.description)
    .bind(role.fixed)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_policy(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    policy: &Policy,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO policies (id, name, resource, subjects, scopes, fixed) VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT DO NOTHING",
    )
    .bind(policy.id)
    .bind(&policy.name)
    .bind(&policy.resource)
    .bind(serde_json::to_value(&policy.subjects).unwrap_or_default())
    .bind(serde_json::to_value(&policy.scopes).unwrap_or_default())
    .bind(policy.fixed)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn data_reset(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM policies").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM users").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM oauth_clients").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM roles").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM scopes").execute(&mut *tx).await?;
    tx.commit().await
}
