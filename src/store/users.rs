use std::sync::Arc;

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::crypto::Cryptor;

use super::{id_or_name_clause, models::User, StoreError};

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    password: String,
    email: String,
    full_name: Option<String>,
    roles: serde_json::Value,
}

/// Typed CRUD over the `users` table. `password` is transparently encrypted
/// on write and decrypted on read through the shared [`Cryptor`] — the one
/// column-level transformer this DAO needs beyond the plain/JSON ones.
#[derive(Clone)]
pub struct UserStore {
    pool: PgPool,
    cryptor: Arc<Cryptor>,
}

impl UserStore {
    pub fn new(pool: PgPool, cryptor: Arc<Cryptor>) -> Self {
        UserStore { pool, cryptor }
    }

    fn decode(&self, row: UserRow) -> Result<User, StoreError> {
        let password = self
            .cryptor
            .decrypt(&row.password)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok());
        let roles: Vec<String> = serde_json::from_value(row.roles).unwrap_or_default();

        Ok(User {
            id: row.id,
            name: row.name,
            password,
            email: row.email,
            full_name: row.full_name,
            roles,
        })
    }

    pub async fn select_all(&self) -> Result<Vec<User>, StoreError> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, name, password, email, full_name, roles FROM users ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|row| self.decode(row)).collect()
    }

    /// Canonical lookup extended to `email` as §4.3 requires for users.
    pub async fn get(&self, id_or_name_or_email: &str) -> Result<Option<User>, StoreError> {
        let clause = id_or_name_clause(Some("email"));
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT id, name, password, email, full_name, roles FROM users WHERE {clause} LIMIT 1"
        ))
        .bind(id_or_name_or_email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| self.decode(r)).transpose()
    }

    pub async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let plaintext = user.password.as_deref().unwrap_or_default();
        let ciphertext = self
            .cryptor
            .encrypt(plaintext.as_bytes())
            .map_err(|_| StoreError::CryptoUnavailable)?;
        let roles = serde_json::to_value(&user.roles).unwrap_or_default();

        let affected = sqlx::query(
            "INSERT INTO users (id, name, password, email, full_name, roles) VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT DO NOTHING",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(ciphertext)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(roles)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(StoreError::Duplicate);
        }
        Ok(())
    }

    pub async fn update(&self, user: &User) -> Result<u64, StoreError> {
        let plaintext = user.password.as_deref().unwrap_or_default();
        let ciphertext = self
            .cryptor
            .encrypt(plaintext.as_bytes())
            .map_err(|_| StoreError::CryptoUnavailable)?;
        let roles = serde_json::to_value(&user.roles).unwrap_or_default();

        let result = sqlx::query(
            "UPDATE users SET name = $2, password = $3, email = $4, full_name = $5, roles = $6 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(ciphertext)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(roles)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id_or_name_or_email: &str) -> Result<u64, StoreError> {
        let clause = id_or_name_clause(Some("email"));
        let result = sqlx::query(&format!("DELETE FROM users WHERE {clause}"))
            .bind(id_or_name_or_email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
