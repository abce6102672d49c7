//! Environment-driven configuration for hosts embedding the row store.
//!
//! # Responsibility
//! - Resolve database location, logging and busy timeout from `ROWSTORE_*`
//!   variables.
//! - Open the configured store and start logging from one place.
//!
//! # Invariants
//! - Loading configuration never touches the filesystem.
//! - Unknown log levels and non-absolute log directories are rejected early.

use crate::db::{open_db_in_memory, open_db_with_options, DbOptions, DbResult, DEFAULT_BUSY_TIMEOUT};
use crate::logging::{default_log_level, init_logging, normalize_level};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_DB_PATH: &str = "ROWSTORE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "ROWSTORE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "ROWSTORE_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "ROWSTORE_BUSY_TIMEOUT_MS";

const IN_MEMORY_PATH: &str = ":memory:";

/// Where the store keeps its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    /// SQLite database file.
    File(PathBuf),
    /// Private in-memory database, lost when the connection closes.
    Memory,
}

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_target: DbTarget,
    pub log_level: &'static str,
    /// Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub busy_timeout: Duration,
}

/// Configuration loading errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required variable is not set or blank.
    Missing(&'static str),
    /// Variable is set but unusable.
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "missing required setting `{key}`"),
            Self::Invalid { key, value, reason } => {
                write!(f, "invalid value `{value}` for `{key}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

impl CoreConfig {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let db_path = read(ENV_DB_PATH).ok_or(ConfigError::Missing(ENV_DB_PATH))?;
        let db_target = if db_path == IN_MEMORY_PATH {
            DbTarget::Memory
        } else {
            DbTarget::File(PathBuf::from(db_path))
        };

        let log_level = match read(ENV_LOG_LEVEL) {
            Some(value) => normalize_level(&value).map_err(|reason| ConfigError::Invalid {
                key: ENV_LOG_LEVEL,
                value,
                reason,
            })?,
            None => default_log_level(),
        };

        let log_dir = match read(ENV_LOG_DIR) {
            Some(value) if !Path::new(&value).is_absolute() => {
                return Err(ConfigError::Invalid {
                    key: ENV_LOG_DIR,
                    value,
                    reason: "must be an absolute path".to_string(),
                });
            }
            Some(value) => Some(PathBuf::from(value)),
            None => None,
        };

        let busy_timeout = match read(ENV_BUSY_TIMEOUT_MS) {
            Some(value) => match value.parse::<u64>() {
                Ok(millis) => Duration::from_millis(millis),
                Err(err) => {
                    return Err(ConfigError::Invalid {
                        key: ENV_BUSY_TIMEOUT_MS,
                        value,
                        reason: err.to_string(),
                    });
                }
            },
            None => DEFAULT_BUSY_TIMEOUT,
        };

        Ok(Self {
            db_target,
            log_level,
            log_dir,
            busy_timeout,
        })
    }

    /// Connection options derived from this configuration.
    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            busy_timeout: self.busy_timeout,
        }
    }

    /// Opens the configured store with migrations applied.
    pub fn open_db(&self) -> DbResult<Connection> {
        match &self.db_target {
            DbTarget::File(path) => open_db_with_options(path, &self.db_options()),
            DbTarget::Memory => open_db_in_memory(),
        }
    }

    /// Starts file logging when a log directory is configured.
    ///
    /// Returns `Ok(false)` when logging is disabled by configuration.
    pub fn init_logging(&self) -> Result<bool, String> {
        let Some(log_dir) = &self.log_dir else {
            return Ok(false);
        };
        let log_dir = log_dir
            .to_str()
            .ok_or_else(|| format!("log_dir is not valid UTF-8: `{}`", log_dir.display()))?;
        init_logging(self.log_level, log_dir)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigError, CoreConfig, DbTarget, ENV_BUSY_TIMEOUT_MS, ENV_DB_PATH, ENV_LOG_DIR,
        ENV_LOG_LEVEL,
    };
    use crate::db::DEFAULT_BUSY_TIMEOUT;
    use crate::logging::default_log_level;
    use std::collections::HashMap;
    use std::time::Duration;

    fn load(pairs: &[(&str, &str)]) -> Result<CoreConfig, ConfigError> {
        let values = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        CoreConfig::from_lookup(|key| values.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_db_path_is_set() {
        let config = load(&[(ENV_DB_PATH, "/var/lib/rowstore/rows.sqlite3")])
            .expect("db path alone should be enough");
        assert_eq!(
            config.db_target,
            DbTarget::File("/var/lib/rowstore/rows.sqlite3".into())
        );
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.log_dir, None);
        assert_eq!(config.busy_timeout, DEFAULT_BUSY_TIMEOUT);
    }

    #[test]
    fn missing_db_path_is_reported() {
        let err = load(&[(ENV_DB_PATH, "   ")]).expect_err("blank path must fail");
        assert_eq!(err, ConfigError::Missing(ENV_DB_PATH));
    }

    #[test]
    fn memory_target_and_overrides_are_parsed() {
        let config = load(&[
            (ENV_DB_PATH, ":memory:"),
            (ENV_LOG_LEVEL, " WARNING "),
            (ENV_LOG_DIR, "/tmp/rowstore-logs"),
            (ENV_BUSY_TIMEOUT_MS, "250"),
        ])
        .expect("overrides should parse");
        assert_eq!(config.db_target, DbTarget::Memory);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some("/tmp/rowstore-logs".into()));
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.db_options().busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn invalid_values_name_the_offending_key() {
        let err = load(&[(ENV_DB_PATH, ":memory:"), (ENV_LOG_LEVEL, "loud")])
            .expect_err("unknown level must fail");
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == ENV_LOG_LEVEL));

        let err = load(&[(ENV_DB_PATH, ":memory:"), (ENV_LOG_DIR, "logs")])
            .expect_err("relative log dir must fail");
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == ENV_LOG_DIR));

        let err = load(&[(ENV_DB_PATH, ":memory:"), (ENV_BUSY_TIMEOUT_MS, "-1")])
            .expect_err("negative timeout must fail");
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == ENV_BUSY_TIMEOUT_MS));
    }

    #[test]
    fn logging_is_skipped_without_log_dir() {
        let config = load(&[(ENV_DB_PATH, ":memory:")]).expect("config should load");
        assert_eq!(config.init_logging(), Ok(false));
    }

    #[test]
    fn configured_memory_store_opens() {
        let config = load(&[(ENV_DB_PATH, ":memory:")]).expect("config should load");
        config.open_db().expect("in-memory store should open");
    }
}
