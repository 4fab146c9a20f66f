//! Logging collaborator and its `tracing` implementation.

use std::time::{Duration, Instant};

use oxide_clause::SqlValue;
use tracing::{error, info, warn};

use crate::config::{LogLevel, LoggerConfig};
use crate::error::Error;

/// Receives registry diagnostics and one trace per executed statement.
pub trait Logger: Send + Sync {
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);

    /// Reports an executed statement. `sql` yields the explained SQL and the
    /// rows affected; it is only worth calling when the entry is emitted.
    fn trace(&self, begin: Instant, sql: &dyn Fn() -> (String, u64), err: Option<&Error>);

    /// Optional capability rewriting SQL and parameters before they are
    /// explained for [`Logger::trace`].
    fn params_filter(&self) -> Option<&dyn ParamsFilter> {
        None
    }
}

/// Redacts parameters before they reach the log.
pub trait ParamsFilter {
    fn filter_params(&self, sql: &str, vars: &[SqlValue]) -> (String, Vec<SqlValue>);
}

/// Default [`Logger`] writing through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    config: LoggerConfig,
}

impl TracingLogger {
    pub const fn new(config: LoggerConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &LoggerConfig {
        &self.config
    }

    fn enabled(&self, level: LogLevel) -> bool {
        self.config.level >= level
    }

    fn slow_threshold(&self) -> Option<Duration> {
        (self.config.slow_threshold_ms > 0)
            .then(|| Duration::from_millis(self.config.slow_threshold_ms))
    }
}

impl Logger for TracingLogger {
    fn info(&self, msg: &str) {
        if self.enabled(LogLevel::Info) {
            info!("{msg}");
        }
    }

    fn warn(&self, msg: &str) {
        if self.enabled(LogLevel::Warn) {
            warn!("{msg}");
        }
    }

    fn error(&self, msg: &str) {
        if self.enabled(LogLevel::Error) {
            error!("{msg}");
        }
    }

    fn trace(&self, begin: Instant, sql: &dyn Fn() -> (String, u64), err: Option<&Error>) {
        if self.config.level == LogLevel::Silent {
            return;
        }
        let elapsed = begin.elapsed();
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;

        match err {
            Some(err)
                if self.enabled(LogLevel::Error)
                    && !(self.config.ignore_record_not_found
                        && err.any(|e| matches!(e, Error::RecordNotFound))) =>
            {
                let (sql, rows) = sql();
                error!(elapsed_ms, rows, sql = %sql, error = %err, "Statement failed");
            }
            _ if self.enabled(LogLevel::Warn)
                && self.slow_threshold().is_some_and(|t| elapsed > t) =>
            {
                let (sql, rows) = sql();
                warn!(elapsed_ms, rows, sql = %sql, "Slow statement");
            }
            _ if self.enabled(LogLevel::Info) => {
                let (sql, rows) = sql();
                info!(elapsed_ms, rows, sql = %sql, "Executed statement");
            }
            _ => {}
        }
    }

    fn params_filter(&self) -> Option<&dyn ParamsFilter> {
        if self.config.parameterized_queries {
            Some(self)
        } else {
            None
        }
    }
}

impl ParamsFilter for TracingLogger {
    fn filter_params(&self, sql: &str, _vars: &[SqlValue]) -> (String, Vec<SqlValue>) {
        (sql.to_string(), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameterized_queries_enables_filter() {
        let logger = TracingLogger::default();
        assert!(logger.params_filter().is_none());

        let logger = TracingLogger::new(LoggerConfig {
            parameterized_queries: true,
            ..LoggerConfig::default()
        });
        let filter = logger.params_filter().unwrap();
        let (sql, vars) = filter.filter_params("SELECT ?", &[SqlValue::Int(1)]);
        assert_eq!(sql, "SELECT ?");
        assert!(vars.is_empty());
    }

    #[test]
    fn test_silent_never_explains() {
        let logger = TracingLogger::new(LoggerConfig {
            level: LogLevel::Silent,
            ..LoggerConfig::default()
        });
        logger.trace(
            Instant::now(),
            &|| -> (String, u64) { panic!("silent logger must not render SQL") },
            Some(&Error::InvalidValue),
        );
    }

    #[test]
    fn test_fast_statement_at_warn_level_is_not_rendered() {
        let logger = TracingLogger::default();
        logger.trace(
            Instant::now(),
            &|| -> (String, u64) { panic!("nothing to report") },
            None,
        );
    }

    #[test]
    fn test_ignored_not_found_is_not_rendered() {
        let logger = TracingLogger::new(LoggerConfig {
            ignore_record_not_found: true,
            slow_threshold_ms: 0,
            ..LoggerConfig::default()
        });
        logger.trace(
            Instant::now(),
            &|| -> (String, u64) { panic!("record not found is ignored") },
            Some(&Error::RecordNotFound),
        );
    }
}
