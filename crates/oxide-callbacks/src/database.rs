//! The database handle.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use oxide_clause::{Dialect, Expression, SqlValue};
use tracing::debug;

use crate::callbacks::Callbacks;
use crate::config::Config;
use crate::defaults::register_default_callbacks;
use crate::error::Result;
use crate::logger::{Logger, TracingLogger};
use crate::pool::ConnPool;
use crate::record::Record;
use crate::statement::Statement;

/// Owns the configuration, the collaborators and the stage set.
///
/// Stages are mutated through `&mut Database` while setting up; operations
/// only need `&Database`.
///
/// ```rust
/// use oxide_callbacks::{Config, ConnPool, Database, ExecResult, Result, Rows};
/// use oxide_clause::{GenericDialect, SqlValue};
///
/// struct NoopPool;
///
/// impl ConnPool for NoopPool {
///     fn exec(&self, _sql: &str, _vars: &[SqlValue]) -> Result<ExecResult> {
///         Ok(ExecResult::default())
///     }
///     fn query(&self, _sql: &str, _vars: &[SqlValue]) -> Result<Rows> {
///         Ok(Rows::default())
///     }
/// }
///
/// let mut db = Database::open(GenericDialect::new(), NoopPool, Config::default()).unwrap();
/// db.callbacks_mut()
///     .query_mut()
///     .register_before("audit", "oxide:query", |_stmt| {})
///     .unwrap();
/// assert_eq!(
///     db.callbacks().query().compiled_order().unwrap(),
///     ["audit", "oxide:query", "oxide:after_query"]
/// );
/// ```
pub struct Database {
    config: Arc<Config>,
    dialect: Arc<dyn Dialect>,
    pool: Arc<dyn ConnPool>,
    logger: Arc<dyn Logger>,
    callbacks: Callbacks,
    now: fn() -> DateTime<Utc>,
}

impl Database {
    /// Opens a handle logging through `tracing`.
    pub fn open(
        dialect: impl Dialect + 'static,
        pool: impl ConnPool + 'static,
        config: Config,
    ) -> Result<Self> {
        let logger = TracingLogger::new(config.logger.clone());
        Self::open_with_logger(dialect, pool, config, logger)
    }

    /// Opens a handle with a custom logger. The built-in steps are registered
    /// unless [`Config::skip_default_callbacks`] is set.
    pub fn open_with_logger(
        dialect: impl Dialect + 'static,
        pool: impl ConnPool + 'static,
        config: Config,
        logger: impl Logger + 'static,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let logger: Arc<dyn Logger> = Arc::new(logger);
        let mut db = Self {
            callbacks: Callbacks::new(&config, &logger),
            config,
            dialect: Arc::new(dialect),
            pool: Arc::new(pool),
            logger,
            now: Utc::now,
        };

        if !db.config.skip_default_callbacks {
            register_default_callbacks(&mut db.callbacks)?;
        }
        debug!(dialect = db.dialect.name(), "Opened database");
        Ok(db)
    }

    /// Replaces the clock used for automatic timestamps.
    #[must_use]
    pub fn with_now_fn(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn pool(&self) -> &dyn ConnPool {
        self.pool.as_ref()
    }

    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.now)()
    }

    pub const fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut Callbacks {
        &mut self.callbacks
    }

    /// Starts a new statement.
    pub fn session(&self) -> Statement<'_> {
        Statement::new(self)
    }

    // ==================== Shortcuts ====================

    pub fn table(&self, table: &str) -> Statement<'_> {
        self.session().table(table)
    }

    pub fn model<'a>(&'a self, model: &'a mut dyn Record) -> Statement<'a> {
        self.session().model(model)
    }

    pub fn where_expr(&self, expr: Expression) -> Statement<'_> {
        self.session().where_expr(expr)
    }

    pub fn raw(&self, sql: &str, vars: Vec<SqlValue>) -> Statement<'_> {
        self.session().raw(sql, vars)
    }

    pub fn create<'a>(&'a self, value: &'a mut dyn Record) -> Statement<'a> {
        self.session().create(value)
    }

    pub fn find<'a>(&'a self, dest: &'a mut dyn Record) -> Statement<'a> {
        self.session().find(dest)
    }

    pub fn first<'a>(&'a self, dest: &'a mut dyn Record) -> Statement<'a> {
        self.session().first(dest)
    }

    /// Executes raw SQL.
    pub fn exec(&self, sql: &str, vars: Vec<SqlValue>) -> Statement<'_> {
        self.raw(sql, vars).exec()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("dialect", &self.dialect.name())
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}
