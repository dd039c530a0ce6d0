//! Response cache keyed by retrieval fingerprint.
//!
//! The key is computed by the chat orchestrator; the cache only stores
//! and retrieves. Two implementations mirror the session store: an
//! in-process map (no TTL enforcement, single instance only) and a
//! durable Postgres store applying the TTL at write time.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgPool;

use crate::error::StoreError;

#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Process-local cache. Entries live until process exit.
#[derive(Default)]
pub struct InMemoryResponseCache {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryResponseCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::QueryError("cache lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::QueryError("cache lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Durable cache on Postgres. Expired entries are invisible to readers
/// and purged on the next write, so the table stays bounded without an
/// external sweeper.
pub struct PgResponseCache {
    pool: PgPool,
    ttl: Duration,
}

impl PgResponseCache {
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS response_cache (
                cache_key TEXT PRIMARY KEY,
                answer TEXT NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl ResponseCache for PgResponseCache {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query(
            "SELECT answer FROM response_cache WHERE cache_key = $1 AND expires_at > now()",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryError(e.to_string()))?;

        Ok(row.map(|r| r.get("answer")))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        // Writes double as garbage collection for entries past their TTL.
        sqlx::query("DELETE FROM response_cache WHERE expires_at <= now()")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO response_cache (cache_key, answer, expires_at)
            VALUES ($1, $2, now() + make_interval(secs => $3))
            ON CONFLICT (cache_key)
            DO UPDATE SET answer = EXCLUDED.answer, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(self.ttl.as_secs_f64())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let cache = InMemoryResponseCache::new();
        assert_eq!(cache.get("k").await.unwrap(), None);

        cache.set("k", "A").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let cache = InMemoryResponseCache::new();
        cache.set("k", "A").await.unwrap();
        cache.set("k", "B").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("B"));
    }
}
