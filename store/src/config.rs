use std::path::PathBuf;

/// Ordered preference list for a full relational connection string.
const CONNECTION_STRING_VARS: &[&str] = &[
    "DATABASE_URL",
    "POSTGRES_URL",
    "POSTGRES_CONNECTION_STRING",
];

pub const DEFAULT_STORE_KEY: &str = "default";
pub const DEFAULT_HISTORY_TABLE: &str = "metrics_history";
pub const DEFAULT_LOCK_TABLE: &str = "refresh_lock";
pub const DEFAULT_PG_SCHEMA: &str = "sitemetrics";
pub const DEFAULT_DB_PATH: &str = "data/metrics.sqlite";

/// How to reach the relational backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PgConnectInfo {
    /// A full connection string, taken verbatim.
    Url(String),
    /// Discrete libpq-style variables.
    Parts {
        host: String,
        port: u16,
        user: Option<String>,
        password: Option<String>,
        database: String,
    },
}

/// Store configuration resolved from the process environment.
///
/// Table, schema, and key names are operator overridable; each backend
/// sanitizes them in its own way before they reach any SQL.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub store_key: String,
    pub history_table: String,
    pub lock_table: String,
    pub pg_schema: String,
    pub db_path: PathBuf,
    pub postgres: Option<PgConnectInfo>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_key: DEFAULT_STORE_KEY.to_string(),
            history_table: DEFAULT_HISTORY_TABLE.to_string(),
            lock_table: DEFAULT_LOCK_TABLE.to_string(),
            pg_schema: DEFAULT_PG_SCHEMA.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            postgres: None,
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        Self {
            store_key: non_empty("SITEMETRICS_STORE_KEY")
                .unwrap_or_else(|| DEFAULT_STORE_KEY.to_string()),
            history_table: non_empty("SITEMETRICS_HISTORY_TABLE")
                .unwrap_or_else(|| DEFAULT_HISTORY_TABLE.to_string()),
            lock_table: non_empty("SITEMETRICS_LOCK_TABLE")
                .unwrap_or_else(|| DEFAULT_LOCK_TABLE.to_string()),
            pg_schema: non_empty("SITEMETRICS_PG_SCHEMA")
                .unwrap_or_else(|| DEFAULT_PG_SCHEMA.to_string()),
            db_path: non_empty("SITEMETRICS_DB_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from),
            postgres: postgres_connect_info(&non_empty),
        }
    }
}

fn postgres_connect_info(non_empty: &impl Fn(&str) -> Option<String>) -> Option<PgConnectInfo> {
    for var in CONNECTION_STRING_VARS.iter().copied() {
        if let Some(url) = non_empty(var) {
            return Some(PgConnectInfo::Url(url));
        }
    }
    // libpq-style discrete variables; host and database are the minimum.
    let host = non_empty("PGHOST")?;
    let database = non_empty("PGDATABASE")?;
    let port = non_empty("PGPORT")
        .and_then(|value| value.parse().ok())
        .unwrap_or(5432);
    Some(PgConnectInfo::Parts {
        host,
        port,
        user: non_empty("PGUSER"),
        password: non_empty("PGPASSWORD"),
        database,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> StoreConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        StoreConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = config_from(&[]);
        assert_eq!(config.store_key, DEFAULT_STORE_KEY);
        assert_eq!(config.history_table, DEFAULT_HISTORY_TABLE);
        assert_eq!(config.lock_table, DEFAULT_LOCK_TABLE);
        assert_eq!(config.pg_schema, DEFAULT_PG_SCHEMA);
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.postgres, None);
    }

    #[test]
    fn connection_string_vars_are_preferred_in_order() {
        let config = config_from(&[
            ("POSTGRES_URL", "postgres://second"),
            ("DATABASE_URL", "postgres://first"),
        ]);
        assert_eq!(
            config.postgres,
            Some(PgConnectInfo::Url("postgres://first".to_string()))
        );
    }

    #[test]
    fn empty_connection_string_falls_through() {
        let config = config_from(&[
            ("DATABASE_URL", "   "),
            ("POSTGRES_URL", "postgres://second"),
        ]);
        assert_eq!(
            config.postgres,
            Some(PgConnectInfo::Url("postgres://second".to_string()))
        );
    }

    #[test]
    fn discrete_variables_assemble_connect_parts() {
        let config = config_from(&[
            ("PGHOST", "db.internal"),
            ("PGPORT", "5433"),
            ("PGUSER", "metrics"),
            ("PGPASSWORD", "hunter2"),
            ("PGDATABASE", "site"),
        ]);
        assert_eq!(
            config.postgres,
            Some(PgConnectInfo::Parts {
                host: "db.internal".to_string(),
                port: 5433,
                user: Some("metrics".to_string()),
                password: Some("hunter2".to_string()),
                database: "site".to_string(),
            })
        );
    }

    #[test]
    fn discrete_variables_require_host_and_database() {
        let config = config_from(&[("PGHOST", "db.internal")]);
        assert_eq!(config.postgres, None);
    }

    #[test]
    fn overrides_replace_defaults() {
        let config = config_from(&[
            ("SITEMETRICS_STORE_KEY", "build-7"),
            ("SITEMETRICS_HISTORY_TABLE", "hist"),
            ("SITEMETRICS_LOCK_TABLE", "locks"),
            ("SITEMETRICS_DB_PATH", "/tmp/site/metrics.sqlite"),
        ]);
        assert_eq!(config.store_key, "build-7");
        assert_eq!(config.history_table, "hist");
        assert_eq!(config.lock_table, "locks");
        assert_eq!(config.db_path, PathBuf::from("/tmp/site/metrics.sqlite"));
    }
}
