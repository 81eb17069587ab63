use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{id_or_name_clause, models::Role, StoreError};

#[derive(FromRow)]
struct RoleRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    fixed: bool,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: row.id,
            name: row.name,
            description: row.description,
            fixed: row.fixed,
        }
    }
}

/// Typed CRUD over the `roles` table. Roles are an independently owned
/// collection; users reference them by name only (see `UserStore`).
#[derive(Clone)]
pub struct RoleStore {
    pool: PgPool,
}

impl RoleStore {
    pub fn new(pool: PgPool) -> Self {
        RoleStore { pool }
    }

    pub async fn select_all(&self) -> Result<Vec<Role>, StoreError> {
        let rows: Vec<RoleRow> =
            sqlx::query_as("SELECT id, name, description, fixed FROM roles ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    pub async fn select_by_names(&self, names: &[String]) -> Result<Vec<Role>, StoreError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<RoleRow> = sqlx::query_as(
            "SELECT id, name, description, fixed FROM roles WHERE name = ANY($1) ORDER BY name",
        )
        .bind(names)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    pub async fn get(&self, id_or_name: &str) -> Result<Option<Role>, StoreError> {
        let clause = id_or_name_clause(None);
        let row: Option<RoleRow> = sqlx::query_as(&format!(
            "SELECT id, name, description, fixed FROM roles WHERE {clause} LIMIT 1"
        ))
        .bind(id_or_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Role::from))
    }

    pub async fn insert(&self, role: &Role) -> Result<(), StoreError> {
        let affected = sqlx::query(
            "INSERT INTO roles (id, name, description, fixed) VALUES ($1, $2, $3, $4) ON CONFLICT DO NOTHING",
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.fixed)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(StoreError::Duplicate);
        }
        Ok(())
    }

    pub async fn update(&self, role: &Role) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE roles SET name = $2, description = $3, fixed = $4 WHERE id = $1",
        )
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.fixed)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id_or_name: &str) -> Result<u64, StoreError> {
        let clause = id_or_name_clause(None);
        let result = sqlx::query(&format!("DELETE FROM roles WHERE {clause}"))
            .bind(id_or_name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
