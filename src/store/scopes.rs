use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{id_or_name_clause, models::Scope, StoreError};

#[derive(FromRow)]
struct ScopeRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    sensitive: bool,
    fixed: bool,
}

impl From<ScopeRow> for Scope {
    fn from(row: ScopeRow) -> Self {
        Scope {
            id: row.id,
            name: row.name,
            description: row.description,
            sensitive: row.sensitive,
            fixed: row.fixed,
        }
    }
}

/// Typed CRUD over the `scopes` table — predefined (`fixed=true`) scopes must
/// never be deleted; callers enforce that before invoking `delete`.
#[derive(Clone)]
pub struct ScopeStore {
    pool: PgPool,
}

impl ScopeStore {
    pub fn new(pool: PgPool) -> Self {
        ScopeStore { pool }
    }

    pub async fn select_all(&self) -> Result<Vec<Scope>, StoreError> {
        let rows: Vec<ScopeRow> =
            sqlx::query_as("SELECT id, name, description, sensitive, fixed FROM scopes ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Scope::from).collect())
    }

    pub async fn get(&self, id_or_name: &str) -> Result<Option<Scope>, StoreError> {
        let clause = id_or_name_clause(None);
        let row: Option<ScopeRow> = sqlx::query_as(&format!(
            "SELECT id, name, description, sensitive, fixed FROM scopes WHERE {clause} LIMIT 1"
        ))
        .bind(id_or_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Scope::from))
    }

    pub async fn insert(&self, scope: &Scope) -> Result<(), StoreError> {
        let affected = sqlx::query(
            "INSERT INTO scopes (id, name, description, sensitive, fixed) VALUES ($1, $2, $3, $4, $5) ON CONFLICT DO NOTHING",
        )
        .bind(scope.id)
        .bind(&scope.name)
        .bind(&scope.description)
        .bind(scope.sensitive)
        .bind(scope.fixed)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(StoreError::Duplicate);
        }
        Ok(())
    }

    pub async fn update(&self, scope: &Scope) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE scopes SET name = $2, description = $3, sensitive = $4, fixed = $5 WHERE id = $1",
        )
        .bind(scope.id)
        .bind(&scope.name)
        .bind(&scope.description)
        .bind(scope.sensitive)
        .bind(scope.fixed)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id_or_name: &str) -> Result<u64, StoreError> {
        let clause = id_or_name_clause(None);
        let result = sqlx::query(&format!("DELETE FROM scopes WHERE {clause}"))
            .bind(id_or_name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
