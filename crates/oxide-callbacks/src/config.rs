//! Database configuration.
//!
//! Every field has a default, so a partial JSON document is enough:
//!
//! ```rust
//! use oxide_callbacks::Config;
//!
//! let config = Config::from_json(r#"{ "dry_run": true, "logger": { "level": "info" } }"#).unwrap();
//! assert!(config.dry_run);
//! assert_eq!(config.query_clauses, ["SELECT", "FROM", "WHERE", "ORDER BY", "LIMIT"]);
//! ```

use serde::{Deserialize, Serialize};

/// Verbosity of the default logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Silent,
    Error,
    #[default]
    Warn,
    Info,
}

/// Settings for [`TracingLogger`](crate::TracingLogger).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: LogLevel,
    /// Statements slower than this are logged as warnings. Zero disables.
    pub slow_threshold_ms: u64,
    /// Do not log "record not found" as an error.
    pub ignore_record_not_found: bool,
    /// Log SQL without its parameter values.
    pub parameterized_queries: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            slow_threshold_ms: 200,
            ignore_record_not_found: false,
            parameterized_queries: false,
        }
    }
}

/// Configuration shared by a [`Database`](crate::Database) and its stages.
///
/// Step conditions are evaluated against this value at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build SQL without executing it.
    pub dry_run: bool,
    /// Do not call model hooks.
    pub skip_hooks: bool,
    /// Do not register the built-in steps on open.
    pub skip_default_callbacks: bool,
    /// Allow UPDATE and DELETE without a WHERE clause.
    pub allow_global_update: bool,
    /// The driver reports the id of the last row of a batch insert rather
    /// than the first.
    pub last_insert_id_reversed: bool,
    pub create_clauses: Vec<String>,
    pub query_clauses: Vec<String>,
    pub update_clauses: Vec<String>,
    pub delete_clauses: Vec<String>,
    pub logger: LoggerConfig,
}

fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dry_run: false,
            skip_hooks: false,
            skip_default_callbacks: false,
            allow_global_update: false,
            last_insert_id_reversed: false,
            create_clauses: names(&["INSERT", "VALUES", "ON CONFLICT", "RETURNING"]),
            query_clauses: names(&["SELECT", "FROM", "WHERE", "ORDER BY", "LIMIT"]),
            update_clauses: names(&["UPDATE", "SET", "WHERE", "RETURNING"]),
            delete_clauses: names(&["DELETE", "FROM", "WHERE", "RETURNING"]),
            logger: LoggerConfig::default(),
        }
    }
}

impl Config {
    /// Parses a configuration from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Sets dry run mode.
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn skip_hooks(mut self, skip: bool) -> Self {
        self.skip_hooks = skip;
        self
    }

    #[must_use]
    pub fn skip_default_callbacks(mut self, skip: bool) -> Self {
        self.skip_default_callbacks = skip;
        self
    }

    #[must_use]
    pub fn allow_global_update(mut self, allow: bool) -> Self {
        self.allow_global_update = allow;
        self
    }

    #[must_use]
    pub fn last_insert_id_reversed(mut self, reversed: bool) -> Self {
        self.last_insert_id_reversed = reversed;
        self
    }

    /// Sets the default logger's settings.
    #[must_use]
    pub fn logger(mut self, logger: LoggerConfig) -> Self {
        self.logger = logger;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.dry_run);
        assert_eq!(
            config.create_clauses,
            ["INSERT", "VALUES", "ON CONFLICT", "RETURNING"]
        );
        assert_eq!(config.logger.level, LogLevel::Warn);
        assert_eq!(config.logger.slow_threshold_ms, 200);
    }

    #[test]
    fn test_from_json_partial() {
        let config = Config::from_json(
            r#"{
                "allow_global_update": true,
                "query_clauses": ["SELECT", "FROM"],
                "logger": { "level": "silent", "parameterized_queries": true }
            }"#,
        )
        .unwrap();
        assert!(config.allow_global_update);
        assert_eq!(config.query_clauses, ["SELECT", "FROM"]);
        assert_eq!(config.logger.level, LogLevel::Silent);
        assert!(config.logger.parameterized_queries);
        assert_eq!(config.logger.slow_threshold_ms, 200);
    }

    #[test]
    fn test_builder_setters() {
        let config = Config::default()
            .dry_run(true)
            .skip_hooks(true)
            .last_insert_id_reversed(true);
        assert!(config.dry_run);
        assert!(config.skip_hooks);
        assert!(config.last_insert_id_reversed);
    }

    #[test]
    fn test_log_level_order() {
        assert!(LogLevel::Info > LogLevel::Warn);
        assert!(LogLevel::Silent < LogLevel::Error);
    }
}
