//! Pluggable persistence for refreshed site metrics.
//!
//! This crate is intentionally small and focused: it stores two kinds of
//! records — the accumulated metrics history and an advisory refresh lock —
//! behind one contract with two interchangeable backends. A PostgreSQL store
//! serves shared deployments; a local SQLite store covers development and
//! single-machine builds. Callers observe identical semantics from both.

mod config;
mod postgres;
mod sqlite;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

pub use config::DEFAULT_DB_PATH;
pub use config::DEFAULT_HISTORY_TABLE;
pub use config::DEFAULT_LOCK_TABLE;
pub use config::DEFAULT_PG_SCHEMA;
pub use config::DEFAULT_STORE_KEY;
pub use config::PgConnectInfo;
pub use config::StoreConfig;
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

/// Storage contract shared by both backends.
///
/// History writes are full-document upserts keyed by the configured store
/// key; at most one record exists per key. Lock records live in a separate
/// table under the same key space, and an absent or unparseable record reads
/// as `None` ("unlocked"). Each method is a single statement against the
/// backend; schema creation happens lazily before the first one.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Current history payload, or `None` when absent or unparseable.
    async fn get_history(&self) -> Result<Option<Value>>;

    /// Upsert the history payload and refresh its timestamp.
    async fn save_history(&self, payload: &Value) -> Result<()>;

    /// Current lock payload, or `None` when unlocked.
    async fn get_lock(&self) -> Result<Option<Value>>;

    /// Upsert the lock record, last writer wins.
    ///
    /// This is a raw storage primitive: two callers that both read `None`
    /// and then `set_lock` will both believe they hold the lock. Use
    /// [`MetricsStore::try_acquire_lock`] for race-free acquisition.
    async fn set_lock(&self, payload: &Value) -> Result<()>;

    /// Atomically insert the lock record if no record exists.
    ///
    /// Returns `true` only for the caller whose insert landed.
    async fn try_acquire_lock(&self, payload: &Value) -> Result<bool>;

    /// Delete the lock record; a no-op when none exists.
    async fn clear_lock(&self) -> Result<()>;
}

/// Select and construct a backend from the process environment.
///
/// Any relational connection variable selects PostgreSQL; otherwise the
/// SQLite store is opened at its configured (or default) path.
pub async fn store_from_env() -> Result<Arc<dyn MetricsStore>> {
    let config = StoreConfig::from_env();
    if config.postgres.is_some() {
        info!("metrics store backend: postgres");
        return Ok(Arc::new(PostgresStore::new(&config)?));
    }
    info!(
        "metrics store backend: sqlite at {}",
        config.db_path.display()
    );
    Ok(Arc::new(SqliteStore::new(&config).await?))
}
