//! # oxide-callbacks
//!
//! Named-step pipelines behind every database operation.
//!
//! Each [`Database`] owns six [`Stage`]s: create, query, update, delete, row
//! and raw. A stage is an ordered list of named steps. Steps declare where
//! they go relative to other steps (`before`/`after`, or `*` for the very
//! start or end), may be replaced or removed by name, and may be enabled only
//! for some configurations. Every change recompiles the order, so conflicts
//! surface where the offending registration is made.
//!
//! This crate provides:
//! - [`Stage`] and [`StepBuilder`] for registering, replacing and removing
//!   steps
//! - [`Statement`], the per-operation state every step reads and mutates
//! - The built-in `oxide:*` steps: hooks, INSERT/SELECT/UPDATE/DELETE
//!   building and execution, raw SQL
//! - [`Model`] and [`Record`] for mapping values to rows
//! - [`ConnPool`] and [`Logger`] seams for the driver and for tracing
//!
//! ## Quick Start
//!
//! ```rust
//! use oxide_callbacks::{Config, ConnPool, Database, ExecResult, Result, Rows};
//! use oxide_clause::{GenericDialect, SqlValue};
//!
//! struct NoopPool;
//!
//! impl ConnPool for NoopPool {
//!     fn exec(&self, _sql: &str, _vars: &[SqlValue]) -> Result<ExecResult> {
//!         Ok(ExecResult::default())
//!     }
//!     fn query(&self, _sql: &str, _vars: &[SqlValue]) -> Result<Rows> {
//!         Ok(Rows::default())
//!     }
//! }
//!
//! let mut db = Database::open(GenericDialect::new(), NoopPool, Config::default()).unwrap();
//!
//! // Runs last on every delete.
//! db.callbacks_mut()
//!     .delete_mut()
//!     .after("*")
//!     .register("audit:delete", |stmt| {
//!         tracing::info!(rows = stmt.rows_affected, "deleted");
//!     })
//!     .unwrap();
//!
//! // Dropping the built-in step leaves only the custom one.
//! db.callbacks_mut().delete_mut().remove("oxide:delete").unwrap();
//! assert_eq!(
//!     db.callbacks().delete().compiled_order().unwrap(),
//!     ["oxide:before_delete", "oxide:after_delete", "audit:delete"]
//! );
//! ```

pub mod callbacks;
mod compiler;
pub mod config;
pub mod database;
mod defaults;
pub mod error;
mod harness;
pub mod logger;
pub mod pool;
pub mod record;
mod registry;
pub mod stage;
pub mod statement;
pub mod step;

pub use callbacks::Callbacks;
pub use config::{Config, LogLevel, LoggerConfig};
pub use database::Database;
pub use error::{Error, Result};
pub use logger::{Logger, ParamsFilter, TracingLogger};
pub use pool::{ConnPool, ExecResult, Rows};
pub use record::{Field, Hook, Model, Record, ReflectValue, Schema, StatementModifier};
pub use stage::{Stage, StageKind, StepBuilder};
pub use statement::{Scope, Statement};
pub use step::{Action, Anchor, Condition, Conflict, Constraint, DuplicateStep, Step};
