use serde_json::Value as JsonValue;
use sqlx::PgPool;
use thiserror::Error;

use crate::clock::Clock;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("storage-error")]
    StorageError,
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct KvEntry {
    pub key: String,
    pub value: JsonValue,
    pub expiry_timestamp: Option<i64>,
}

impl KvEntry {
    pub fn new(key: impl Into<String>, value: JsonValue, expiry_timestamp: Option<i64>) -> Self {
        KvEntry {
            key: key.into(),
            value,
            expiry_timestamp,
        }
    }
}

/// TTL-scoped key-to-JSON map persisted in SQL. Device-flow initiation writes
/// four correlated keys in one `batch_set` call so a racing poll never
/// observes a partially-written pending state.
#[derive(Clone)]
pub struct KeyValueStore {
    pool: PgPool,
    clock: Clock,
}

impl KeyValueStore {
    pub fn new(pool: PgPool, clock: Clock) -> Self {
        KeyValueStore { pool, clock }
    }

    pub async fn get(&self, key: &str) -> Result<Option<JsonValue>, KvError> {
        let now = self.clock.now_ts();
        let row: Option<(JsonValue,)> = sqlx::query_as(
            "SELECT v FROM kv WHERE k = $1 AND (expiry_timestamp IS NULL OR expiry_timestamp > $2) LIMIT 1",
        )
        .bind(key)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(v,)| v))
    }

    /// Deletes `key` and opportunistically garbage-collects any row whose TTL
    /// has already elapsed.
    pub async fn delete(&self, key: &str) -> Result<(), KvError> {
        let now = self.clock.now_ts();
        sqlx::query("DELETE FROM kv WHERE k = $1 OR expiry_timestamp <= $2")
            .bind(key)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set(
        &self,
        key: &str,
        value: JsonValue,
        expiry_timestamp: Option<i64>,
    ) -> Result<(), KvError> {
        self.batch_set(&[KvEntry::new(key, value, expiry_timestamp)])
            .await
    }

    /// Upserts every entry inside one transaction: insert-on-conflict-do-nothing,
    /// falling back to an UPDATE by key if nothing was inserted. If neither
    /// affects a row the whole batch fails with `storage-error` and rolls back.
    pub async fn batch_set(&self, entries: &[KvEntry]) -> Result<(), KvError> {
        let mut tx = self.pool.begin().await?;

        for entry in entries {
            let inserted = sqlx::query(
                "INSERT INTO kv (k, v, expiry_timestamp) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
            )
            .bind(&entry.key)
            .bind(&entry.value)
            .bind(entry.expiry_timestamp)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if inserted == 0 {
                let updated = sqlx::query(
                    "UPDATE kv SET v = $2, expiry_timestamp = $3 WHERE k = $1",
                )
                .bind(&entry.key)
                .bind(&entry.value)
                .bind(entry.expiry_timestamp)
                .execute(&mut *tx)
                .await?
                .rows_affected();

                if updated == 0 {
                    return Err(KvError::StorageError);
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // Exercised against a real Postgres in tests/kv_test.rs; pure-logic
    // helpers (none currently) would live here.
}
