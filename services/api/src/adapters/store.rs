//! services/api/src/adapters/store.rs
//!
//! This module contains the storage adapter, which is the concrete implementation
//! of the `KeyValueStore` port from the `core` crate. Values are kept as JSONB
//! rows in a single PostgreSQL table using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use study_assistant_core::ports::{KeyValueStore, PortError, PortResult};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A storage adapter that implements the `KeyValueStore` port.
#[derive(Clone)]
pub struct PgKeyValueStore {
    pool: PgPool,
}

impl PgKeyValueStore {
    /// Creates a new `PgKeyValueStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct EntryRecord {
    value: Value,
    updated_at: DateTime<Utc>,
}

//=========================================================================================
// `KeyValueStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl KeyValueStore for PgKeyValueStore {
    async fn get(&self, key: &str) -> PortResult<Option<Value>> {
        let record = sqlx::query_as::<_, EntryRecord>(
            "SELECT value, updated_at FROM kv_store WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Storage(e.to_string()))?;

        Ok(record.map(|r| {
            debug!("Loaded '{}' (last written {}).", key, r.updated_at);
            r.value
        }))
    }

    async fn set(&self, key: &str, value: Value) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO kv_store (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Storage(e.to_string()))?;
        Ok(())
    }
}
