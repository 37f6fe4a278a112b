use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use log::LevelFilter;
use serde_json::Value;
use sqlx::ConnectOptions;
use sqlx::Row;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::sqlite::SqliteJournalMode;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::sqlite::SqliteSynchronous;
use tokio::sync::OnceCell;
use tracing::warn;

use crate::MetricsStore;
use crate::config::DEFAULT_HISTORY_TABLE;
use crate::config::DEFAULT_LOCK_TABLE;
use crate::config::StoreConfig;

/// Embedded file-backed metrics store.
///
/// Opens a single SQLite database in WAL mode with relaxed synchronous
/// flushing: this is a low-stakes local cache, not a ledger, and the journal
/// already serializes writers at the engine level. Payloads are stored as
/// serialized JSON text and parsed back on read.
pub struct SqliteStore {
    pool: SqlitePool,
    init: OnceCell<()>,
    store_key: String,
    history_ddl: String,
    lock_ddl: String,
    history_select: String,
    history_upsert: String,
    lock_select: String,
    lock_upsert: String,
    lock_insert: String,
    lock_delete: String,
}

impl SqliteStore {
    /// Open (or create) the database file named by `config.db_path`,
    /// creating its parent directory first.
    pub async fn new(config: &StoreConfig) -> Result<Self> {
        if let Some(parent) = config.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let pool = open_sqlite(&config.db_path).await?;

        let history = sanitized_table_name(&config.history_table, DEFAULT_HISTORY_TABLE);
        let lock = sanitized_table_name(&config.lock_table, DEFAULT_LOCK_TABLE);
        Ok(Self {
            history_ddl: table_ddl(&history),
            lock_ddl: table_ddl(&lock),
            history_select: format!("SELECT payload FROM {history} WHERE key = ?"),
            history_upsert: upsert_sql(&history),
            lock_select: format!("SELECT payload FROM {lock} WHERE key = ?"),
            lock_upsert: upsert_sql(&lock),
            lock_insert: format!(
                "INSERT INTO {lock} (key, payload, updated_at) VALUES (?, ?, ?) ON CONFLICT(key) DO NOTHING"
            ),
            lock_delete: format!("DELETE FROM {lock} WHERE key = ?"),
            store_key: config.store_key.clone(),
            pool,
            init: OnceCell::new(),
        })
    }

    /// Create both tables at most once per process. `IF NOT EXISTS` keeps
    /// concurrent first-use from other processes from raising.
    async fn ensure_schema(&self) -> Result<()> {
        self.init
            .get_or_try_init(|| async {
                sqlx::query(&self.history_ddl).execute(&self.pool).await?;
                sqlx::query(&self.lock_ddl).execute(&self.pool).await?;
                anyhow::Ok(())
            })
            .await?;
        Ok(())
    }

    async fn select_payload(&self, sql: &str) -> Result<Option<Value>> {
        self.ensure_schema().await?;
        let row = sqlx::query(sql)
            .bind(self.store_key.as_str())
            .fetch_optional(&self.pool)
            .await?;
        // A payload that no longer parses reads the same as no record.
        Ok(row
            .and_then(|row| row.try_get::<String, _>("payload").ok())
            .and_then(|text| serde_json::from_str(&text).ok()))
    }

    async fn upsert_payload(&self, sql: &str, payload: &Value) -> Result<()> {
        self.ensure_schema().await?;
        sqlx::query(sql)
            .bind(self.store_key.as_str())
            .bind(serde_json::to_string(payload)?)
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MetricsStore for SqliteStore {
    async fn get_history(&self) -> Result<Option<Value>> {
        self.select_payload(&self.history_select).await
    }

    async fn save_history(&self, payload: &Value) -> Result<()> {
        self.upsert_payload(&self.history_upsert, payload).await
    }

    async fn get_lock(&self) -> Result<Option<Value>> {
        self.select_payload(&self.lock_select).await
    }

    async fn set_lock(&self, payload: &Value) -> Result<()> {
        self.upsert_payload(&self.lock_upsert, payload).await
    }

    async fn try_acquire_lock(&self, payload: &Value) -> Result<bool> {
        self.ensure_schema().await?;
        let result = sqlx::query(&self.lock_insert)
            .bind(self.store_key.as_str())
            .bind(serde_json::to_string(payload)?)
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn clear_lock(&self) -> Result<()> {
        self.ensure_schema().await?;
        sqlx::query(&self.lock_delete)
            .bind(self.store_key.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

async fn open_sqlite(path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5))
        .log_statements(LevelFilter::Off);
    let display = path.display();
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open sqlite db at {display}"))
}

fn table_ddl(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (key TEXT PRIMARY KEY, payload TEXT NOT NULL, updated_at INTEGER NOT NULL)"
    )
}

fn upsert_sql(table: &str) -> String {
    format!(
        "INSERT INTO {table} (key, payload, updated_at) VALUES (?, ?, ?) \
         ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at"
    )
}

/// Table names come from the environment. Strip anything outside
/// `[A-Za-z0-9_]`; a name that loses characters in the process was not a
/// plain identifier, so reject it in favor of the default.
fn sanitized_table_name(raw: &str, default: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .collect();
    if cleaned.is_empty() || cleaned != raw {
        warn!("invalid table name {raw:?}, using {default:?}");
        return default.to_string();
    }
    cleaned
}
