//! Conversation session store.
//!
//! Append-only ordered turn history per session id, with two
//! implementations: an in-process map for single-instance or test
//! deployments (no persistence, no TTL enforcement) and a durable
//! Postgres store shared across service instances, where every append
//! atomically refreshes the session TTL.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgRow};

use crate::error::StoreError;
use crate::models::{Role, Turn};

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Ordered turn history for a session. Unknown sessions yield an
    /// empty history; absence is normal, not an error.
    async fn get(&self, session_id: &str) -> Result<Vec<Turn>, StoreError>;

    /// Append one turn, creating the session if absent and refreshing
    /// its TTL.
    async fn append(&self, session_id: &str, role: Role, content: &str) -> Result<(), StoreError>;
}

/// Process-local session store. Not safe across multiple service
/// processes; sessions vanish on exit.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Vec<Turn>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Vec<Turn>, StoreError> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| StoreError::QueryError("session lock poisoned".to_string()))?;
        Ok(sessions.get(session_id).cloned().unwrap_or_default())
    }

    async fn append(&self, session_id: &str, role: Role, content: &str) -> Result<(), StoreError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| StoreError::QueryError("session lock poisoned".to_string()))?;
        sessions
            .entry(session_id.to_string())
            .or_default()
            .push(Turn::new(role, content));
        Ok(())
    }
}

/// Durable session store on Postgres, shared across instances. Expired
/// sessions are invisible to readers and purged on the next append, with
/// their turns removed by the cascade.
pub struct PgSessionStore {
    pool: PgPool,
    ttl: Duration,
}

impl PgSessionStore {
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_sessions (
                session_id TEXT PRIMARY KEY,
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_turns (
                id BIGSERIAL PRIMARY KEY,
                session_id TEXT NOT NULL REFERENCES chat_sessions(session_id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                content TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryError(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS chat_turns_session_idx ON chat_turns (session_id, id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, session_id: &str) -> Result<Vec<Turn>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT t.role, t.content
            FROM chat_turns t
            JOIN chat_sessions s ON s.session_id = t.session_id
            WHERE t.session_id = $1 AND s.expires_at > now()
            ORDER BY t.id
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryError(e.to_string()))?;

        rows.into_iter()
            .map(|row: PgRow| {
                let role: String = row.get("role");
                let content: String = row.get("content");
                let role = role
                    .parse::<Role>()
                    .map_err(StoreError::InvalidTurn)?;
                Ok(Turn::new(role, content))
            })
            .collect()
    }

    async fn append(&self, session_id: &str, role: Role, content: &str) -> Result<(), StoreError> {
        // One transaction: turn insert and TTL refresh never tear apart,
        // so concurrent appends to the same session are neither lost nor
        // reordered relative to each other.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;

        // Purge sessions past their TTL before refreshing this one; the
        // cascade drops their turns.
        sqlx::query("DELETE FROM chat_sessions WHERE expires_at <= now()")
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO chat_sessions (session_id, expires_at)
            VALUES ($1, now() + make_interval(secs => $2))
            ON CONFLICT (session_id)
            DO UPDATE SET expires_at = now() + make_interval(secs => $2)
            "#,
        )
        .bind(session_id)
        .bind(self.ttl.as_secs_f64())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::QueryError(e.to_string()))?;

        sqlx::query("INSERT INTO chat_turns (session_id, role, content) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(role.as_str())
            .bind(content)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_session_yields_empty_history() {
        let store = InMemorySessionStore::new();
        assert!(store.get("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_appends_preserve_insertion_order() {
        let store = InMemorySessionStore::new();
        store.append("s1", Role::User, "hi").await.unwrap();
        store.append("s1", Role::Assistant, "hello").await.unwrap();

        let history = store.get("s1").await.unwrap();
        assert_eq!(
            history,
            vec![
                Turn::new(Role::User, "hi"),
                Turn::new(Role::Assistant, "hello"),
            ]
        );
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = InMemorySessionStore::new();
        store.append("a", Role::User, "one").await.unwrap();
        store.append("b", Role::User, "two").await.unwrap();

        assert_eq!(store.get("a").await.unwrap().len(), 1);
        assert_eq!(store.get("b").await.unwrap().len(), 1);
        assert_eq!(store.get("b").await.unwrap()[0].content, "two");
    }
}
