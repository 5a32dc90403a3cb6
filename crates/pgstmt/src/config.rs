//! Execution settings: SQL logging, truncation and statement timeouts.
//!
//! Defaults suit development; [`ExecConfig::from_env`] reads `PGSTMT_*`
//! overrides.

use crate::error::{StmtError, StmtResult};
use std::time::Duration;

/// Environment variable: `true`/`false`, emit a `pgstmt.sql` event per statement.
pub const ENV_LOG_SQL: &str = "PGSTMT_LOG_SQL";
/// Environment variable: truncate logged SQL to this many bytes (`0` disables truncation).
pub const ENV_MAX_SQL_LENGTH: &str = "PGSTMT_MAX_SQL_LENGTH";
/// Environment variable: per-statement timeout in milliseconds.
pub const ENV_STATEMENT_TIMEOUT_MS: &str = "PGSTMT_STATEMENT_TIMEOUT_MS";

/// Settings for the execution helpers.
///
/// By default SQL logging is on (at `DEBUG`, truncated to 200 bytes) and
/// there is no timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecConfig {
    /// Emit a tracing event before each statement.
    pub log_sql: bool,
    /// Truncate logged SQL. `None` means no truncation.
    pub max_sql_length: Option<usize>,
    /// Statement timeout. `None` means no timeout.
    pub statement_timeout: Option<Duration>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            log_sql: true,
            max_sql_length: Some(200),
            statement_timeout: None,
        }
    }
}

impl ExecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_sql(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    /// Set maximum SQL length to log.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Set the statement timeout.
    ///
    /// A statement exceeding it is cancelled server-side (best effort) and
    /// returns [`StmtError::Timeout`].
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    /// Read overrides from the `PGSTMT_*` environment variables. Unset
    /// variables keep their defaults.
    pub fn from_env() -> StmtResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ExecConfig::from_env`], with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StmtResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup(ENV_LOG_SQL) {
            config.log_sql = match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(StmtError::Config(format!(
                        "{ENV_LOG_SQL}: expected a boolean, got '{other}'"
                    )));
                }
            };
        }

        if let Some(v) = lookup(ENV_MAX_SQL_LENGTH) {
            config.max_sql_length = match parse_number(ENV_MAX_SQL_LENGTH, &v)? {
                0 => None,
                n => Some(usize::try_from(n).map_err(|_| {
                    StmtError::Config(format!("{ENV_MAX_SQL_LENGTH}: {n} does not fit in usize"))
                })?),
            };
        }

        if let Some(v) = lookup(ENV_STATEMENT_TIMEOUT_MS) {
            config.statement_timeout = match parse_number(ENV_STATEMENT_TIMEOUT_MS, &v)? {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            };
        }

        Ok(config)
    }
}

fn parse_number(key: &str, value: &str) -> StmtResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| StmtError::Config(format!("{key}: {e} ('{value}')")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ExecConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ExecConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = ExecConfig::from_lookup(lookup(&[
            (ENV_LOG_SQL, "off"),
            (ENV_MAX_SQL_LENGTH, "0"),
            (ENV_STATEMENT_TIMEOUT_MS, "1500"),
        ]))
        .unwrap();
        assert!(!config.log_sql);
        assert_eq!(config.max_sql_length, None);
        assert_eq!(config.statement_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn rejects_garbage() {
        let err = ExecConfig::from_lookup(lookup(&[(ENV_STATEMENT_TIMEOUT_MS, "soon")])).unwrap_err();
        assert!(matches!(err, StmtError::Config(msg) if msg.contains(ENV_STATEMENT_TIMEOUT_MS)));

        let err = ExecConfig::from_lookup(lookup(&[(ENV_LOG_SQL, "maybe")])).unwrap_err();
        assert!(matches!(err, StmtError::Config(_)));
    }

    #[test]
    fn setters_chain() {
        let config = ExecConfig::new()
            .log_sql(false)
            .max_sql_length(80)
            .with_statement_timeout(Duration::from_secs(2));
        assert_eq!(config.max_sql_length, Some(80));
        assert_eq!(config.statement_timeout, Some(Duration::from_secs(2)));
        assert!(ExecConfig::new().no_truncate().max_sql_length.is_none());
    }

    #[test]
    fn reads_sql_length() {
        let config = ExecConfig::from_lookup(lookup(&[(ENV_MAX_SQL_LENGTH, " 512 ")])).unwrap();
        assert_eq!(config.max_sql_length, Some(512));

        let err = ExecConfig::from_lookup(lookup(&[(ENV_MAX_SQL_LENGTH, "-1")])).unwrap_err();
        assert!(matches!(err, StmtError::Config(msg) if msg.contains(ENV_MAX_SQL_LENGTH)));
    }
}
