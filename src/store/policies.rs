use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{id_or_name_clause, models::Policy, StoreError};

#[derive(FromRow)]
struct PolicyRow {
    id: Uuid,
    name: String,
    resource: String,
    subjects: JsonValue,
    scopes: JsonValue,
    fixed: bool,
}

impl From<PolicyRow> for Policy {
    fn from(row: PolicyRow) -> Self {
        Policy {
            id: row.id,
            name: row.name,
            resource: row.resource,
            subjects: serde_json::from_value(row.subjects).unwrap_or_default(),
            scopes: serde_json::from_value(row.scopes).unwrap_or_default(),
            fixed: row.fixed,
        }
    }
}

/// Typed CRUD over the `policies` table. `select_by_resource` implements the
/// §4.4 step-2 resource match: a trailing-slash resource URL is a prefix
/// match (`resource LIKE R || '%'`), otherwise an exact match.
#[derive(Clone)]
pub struct PolicyStore {
    pool: PgPool,
}

impl PolicyStore {
    pub fn new(pool: PgPool) -> Self {
        PolicyStore { pool }
    }

    pub async fn select_all(&self) -> Result<Vec<Policy>, StoreError> {
        let rows: Vec<PolicyRow> = sqlx::query_as(
            "SELECT id, name, resource, subjects, scopes, fixed FROM policies ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Policy::from).collect())
    }

    pub async fn select_by_resource(&self, resource_url: &str) -> Result<Vec<Policy>, StoreError> {
        let rows: Vec<PolicyRow> = if let Some(prefix) = resource_url.strip_suffix('/') {
            let pattern = format!("{prefix}/%");
            sqlx::query_as(
                "SELECT id, name, resource, subjects, scopes, fixed FROM policies WHERE resource LIKE $1 ORDER BY name",
            )
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                "SELECT id, name, resource, subjects, scopes, fixed FROM policies WHERE resource = $1 ORDER BY name",
            )
            .bind(resource_url)
            .fetch_all(&self.pool)
            .await?
        };
        Ok(rows.into_iter().map(Policy::from).collect())
    }

    pub async fn get(&self, id_or_name: &str) -> Result<Option<Policy>, StoreError> {
        let clause = id_or_name_clause(None);
        let row: Option<PolicyRow> = sqlx::query_as(&format!(
            "SELECT id, name, resource, subjects, scopes, fixed FROM policies WHERE {clause} LIMIT 1"
        ))
        .bind(id_or_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Policy::from))
    }

    pub async fn insert(&self, policy: &Policy) -> Result<(), StoreError> {
        let affected = sqlx::query(
            "INSERT INTO policies (id, name, resource, subjects, scopes, fixed) VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT DO NOTHING",
        )
        .bind(policy.id)
        .bind(&policy.name)
        .bind(&policy.resource)
        .bind(serde_json::to_value(&policy.subjects).unwrap_or_default())
        .bind(serde_json::to_value(&policy.scopes).unwrap_or_default())
        .bind(policy.fixed)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(StoreError::Duplicate);
        }
        Ok(())
    }

    pub async fn update(&self, policy: &Policy) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE policies SET name = $2, resource = $3, subjects = $4, scopes = $5, fixed = $6 WHERE id = $1",
        )
        .bind(policy.id)
        .bind(&policy.name)
        .bind(&policy.resource)
        .bind(serde_json::to_value(&policy.subjects).unwrap_or_default())
        .bind(serde_json::to_value(&policy.scopes).unwrap_or_default())
        .bind(policy.fixed)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id_or_name: &str) -> Result<u64, StoreError> {
        let clause = id_or_name_clause(None);
        let result = sqlx::query(&format!("DELETE FROM policies WHERE {clause}"))
            .bind(id_or_name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
