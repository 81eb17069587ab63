use std::sync::Arc;

use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::crypto::Cryptor;

use super::{id_or_name_clause, models::OAuthClient, StoreError};

#[derive(FromRow)]
struct ClientRow {
    id: Uuid,
    name: String,
    secret: String,
    audience: Option<String>,
    grant_types: JsonValue,
    response_types: JsonValue,
    scopes: JsonValue,
    extras: JsonValue,
    description: Option<String>,
}

/// Typed CRUD over the `oauth_clients` table; `secret` is transparently
/// encrypted on write and decrypted on read, same transformer as `UserStore`.
#[derive(Clone)]
pub struct ClientStore {
    pool: PgPool,
    cryptor: Arc<Cryptor>,
}

impl ClientStore {
    pub fn new(pool: PgPool, cryptor: Arc<Cryptor>) -> Self {
        ClientStore { pool, cryptor }
    }

    fn decode(&self, row: ClientRow) -> Result<OAuthClient, StoreError> {
        let secret = self
            .cryptor
            .decrypt(&row.secret)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok());

        Ok(OAuthClient {
            id: row.id,
            name: row.name,
            secret,
            audience: row.audience,
            grant_types: serde_json::from_value(row.grant_types).unwrap_or_default(),
            response_types: serde_json::from_value(row.response_types).unwrap_or_default(),
            scopes: serde_json::from_value(row.scopes).unwrap_or_default(),
            extras: row.extras,
            description: row.description,
        })
    }

    pub async fn select_all(&self) -> Result<Vec<OAuthClient>, StoreError> {
        let rows: Vec<ClientRow> = sqlx::query_as(
            "SELECT id, name, secret, audience, grant_types, response_types, scopes, extras, description FROM oauth_clients ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|row| self.decode(row)).collect()
    }

    pub async fn get(&self, id_or_name: &str) -> Result<Option<OAuthClient>, StoreError> {
        let clause = id_or_name_clause(None);
        let row: Option<ClientRow> = sqlx::query_as(&format!(
            "SELECT id, name, secret, audience, grant_types, response_types, scopes, extras, description FROM oauth_clients WHERE {clause} LIMIT 1"
        ))
        .bind(id_or_name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| self.decode(r)).transpose()
    }

    pub async fn insert(&self, client: &OAuthClient) -> Result<(), StoreError> {
        let plaintext = client.secret.as_deref().unwrap_or_default();
        let ciphertext = self
            .cryptor
            .encrypt(plaintext.as_bytes())
            .map_err(|_| StoreError::CryptoUnavailable)?;

        let affected = sqlx::query(
            "INSERT INTO oauth_clients (id, name, secret, audience, grant_types, response_types, scopes, extras, description) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) ON CONFLICT DO NOTHING",
        )
        .bind(client.id)
        .bind(&client.name)
        .bind(ciphertext)
        .bind(&client.audience)
        .bind(serde_json::to_value(&client.grant_types).unwrap_or_default())
        .bind(serde_json::to_value(&client.response_types).unwrap_or_default())
        .bind(serde_json::to_value(&client.scopes).unwrap_or_default())
        .bind(&client.extras)
        .bind(&client.description)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(StoreError::Duplicate);
        }
        Ok(())
    }

    pub async fn update(&self, client: &OAuthClient) -> Result<u64, StoreError> {
        let plaintext = client.secret.as_deref().unwrap_or_default();
        let ciphertext = self
            .cryptor
            .encrypt(plaintext.as_bytes())
            .map_err(|_| StoreError::CryptoUnavailable)?;

        let result = sqlx::query(
            "UPDATE oauth_clients SET name = $2, secret = $3, audience = $4, grant_types = $5, response_types = $6, scopes = $7, extras = $8, description = $9 WHERE id = $1",
        )
        .bind(client.id)
        .bind(&client.name)
        .bind(ciphertext)
        .bind(&client.audience)
        .bind(serde_json::to_value(&client.grant_types).unwrap_or_default())
        .bind(serde_json::to_value(&client.response_types).unwrap_or_default())
        .bind(serde_json::to_value(&client.scopes).unwrap_or_default())
        .bind(&client.extras)
        .bind(&client.description)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id_or_name: &str) -> Result<u64, StoreError> {
        let clause = id_or_name_clause(None);
        let result = sqlx::query(&format!("DELETE FROM oauth_clients WHERE {clause}"))
            .bind(id_or_name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
