//! Configuration loading and representation.
//!
//! Values come from `WAREHOUSE_*` environment variables. A missing variable
//! falls back to its default; a malformed one is an error.

use thiserror::Error;

use warehouse_inventory::DeletePolicy;

pub const DATABASE_URL_VAR: &str = "WAREHOUSE_DATABASE_URL";
pub const DELETE_POLICY_VAR: &str = "WAREHOUSE_DELETE_POLICY";
pub const LOW_STOCK_THRESHOLD_VAR: &str = "WAREHOUSE_LOW_STOCK_THRESHOLD";
pub const MAX_CONNECTIONS_VAR: &str = "WAREHOUSE_MAX_CONNECTIONS";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// sqlx connection URL, e.g. `sqlite://warehouse.db` or `sqlite::memory:`.
    pub database_url: String,
    pub delete_policy: DeletePolicy,
    /// Products with quantity strictly below this are reported as low stock.
    pub low_stock_threshold: i64,
    pub max_connections: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://warehouse.db".to_string(),
            delete_policy: DeletePolicy::Restrict,
            low_stock_threshold: 5,
            max_connections: 5,
        }
    }
}

impl LedgerConfig {
    /// In-memory SQLite configuration, mostly for tests.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            ..Self::default()
        }
    }

    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    pub fn with_low_stock_threshold(mut self, threshold: i64) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let database_url = match lookup(DATABASE_URL_VAR) {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => {
                tracing::warn!(
                    "{DATABASE_URL_VAR} not set; using {}",
                    defaults.database_url
                );
                defaults.database_url
            }
        };

        let delete_policy = match lookup(DELETE_POLICY_VAR) {
            Some(raw) => raw.parse::<DeletePolicy>().map_err(|e| ConfigError::Invalid {
                key: DELETE_POLICY_VAR,
                reason: e.to_string(),
            })?,
            None => defaults.delete_policy,
        };

        let low_stock_threshold = match lookup(LOW_STOCK_THRESHOLD_VAR) {
            Some(raw) => {
                let value: i64 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                    key: LOW_STOCK_THRESHOLD_VAR,
                    reason: format!("{e}"),
                })?;
                if value < 0 {
                    return Err(ConfigError::Invalid {
                        key: LOW_STOCK_THRESHOLD_VAR,
                        reason: "must not be negative".to_string(),
                    });
                }
                value
            }
            None => defaults.low_stock_threshold,
        };

        let max_connections = match lookup(MAX_CONNECTIONS_VAR) {
            Some(raw) => {
                let value: u32 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                    key: MAX_CONNECTIONS_VAR,
                    reason: format!("{e}"),
                })?;
                if value == 0 {
                    return Err(ConfigError::Invalid {
                        key: MAX_CONNECTIONS_VAR,
                        reason: "must be at least 1".to_string(),
                    });
                }
                value
            }
            None => defaults.max_connections,
        };

        Ok(Self {
            database_url,
            delete_policy,
            low_stock_threshold,
            max_connections,
        })
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}
