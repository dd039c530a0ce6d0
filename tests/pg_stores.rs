//! Durable chat store integration tests.
//!
//! These exercise TTL expiry and purge behavior against a real Postgres
//! instance and are ignored by default:
//!
//! ```sh
//! RAGCHAT_TEST_PG_URL=postgres://localhost/ragchat_test \
//!     cargo test --test pg_stores -- --ignored
//! ```

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use ragchat::models::Role;
use ragchat::services::{PgResponseCache, PgSessionStore, ResponseCache, SessionStore};

async fn test_pool() -> PgPool {
    let url = std::env::var("RAGCHAT_TEST_PG_URL")
        .expect("set RAGCHAT_TEST_PG_URL to run Postgres store tests");
    PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("failed to connect to test database")
}

/// Tables persist across runs; unique keys keep tests independent.
fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore]
async fn cached_answer_expires() {
    let pool = test_pool().await;
    let cache = PgResponseCache::new(pool, Duration::from_millis(300));
    cache.ensure_schema().await.unwrap();

    let key = unique("key");
    cache.set(&key, "answer").await.unwrap();
    assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("answer"));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(cache.get(&key).await.unwrap(), None);
}

#[tokio::test]
#[ignore]
async fn cache_set_purges_expired_rows() {
    let pool = test_pool().await;
    let cache = PgResponseCache::new(pool.clone(), Duration::from_millis(200));
    cache.ensure_schema().await.unwrap();

    let stale = unique("stale");
    cache.set(&stale, "old").await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    cache.set(&unique("fresh"), "new").await.unwrap();

    let remaining: i64 =
        sqlx::query_scalar("SELECT count(*) FROM response_cache WHERE cache_key = $1")
            .bind(&stale)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
#[ignore]
async fn session_append_refreshes_ttl() {
    let pool = test_pool().await;
    let store = PgSessionStore::new(pool, Duration::from_millis(400));
    store.ensure_schema().await.unwrap();

    let session = unique("session");
    store.append(&session, Role::User, "first").await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;

    // Refresh before the first TTL elapses, then cross it: the whole
    // history must still be visible.
    store
        .append(&session, Role::Assistant, "second")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;

    let history = store.get(&session).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "first");

    // No further refresh; the history goes dark as one unit.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(store.get(&session).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore]
async fn expired_sessions_are_purged_on_append() {
    let pool = test_pool().await;
    let store = PgSessionStore::new(pool.clone(), Duration::from_millis(200));
    store.ensure_schema().await.unwrap();

    let stale = unique("stale");
    store.append(&stale, Role::User, "gone").await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    store.append(&unique("fresh"), Role::User, "here").await.unwrap();

    let remaining: i64 =
        sqlx::query_scalar("SELECT count(*) FROM chat_turns WHERE session_id = $1")
            .bind(&stale)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, 0);
}
