//! # oxide-clause
//!
//! The SQL-shaped pieces the callback pipeline produces and consumes.
//!
//! This crate provides:
//! - [`SqlValue`] parameters and the [`ToSqlValue`] conversion trait
//! - The [`Dialect`] trait: identifier quoting, placeholders, and rendering
//!   traced SQL with its parameters
//! - The [`Builder`] trait every clause writes through
//! - Named [`Clause`]s and condition [`Expression`]s with AND/OR/NOT
//!   parenthesization
//!
//! ## Example
//!
//! ```rust
//! use oxide_clause::{and, or, Clause, Expression, GenericDialect, SqlBuilder, Where};
//!
//! let dialect = GenericDialect::new();
//! let mut builder = SqlBuilder::new(&dialect);
//!
//! let clause = Clause::from(Where::new(vec![and(vec![
//!     Expression::eq("active", true),
//!     or(vec![Expression::eq("role", "admin"), Expression::gt("karma", 100)]),
//! ])]));
//! clause.build(&mut builder);
//!
//! let (sql, params) = builder.finish();
//! assert_eq!(sql, "WHERE \"active\" = ? AND (\"role\" = ? OR \"karma\" > ?)");
//! assert_eq!(params.len(), 3);
//! ```

pub mod builder;
pub mod clause;
pub mod dialect;
pub mod expression;
pub mod value;

pub use builder::{Builder, SqlBuilder};
pub use clause::{
    Assignment, Clause, Delete, FromTable, Insert, Limit, OnConflict, OrderBy, OrderByColumn,
    Returning, Select, Set, Update, Values, Where,
};
pub use dialect::{Dialect, GenericDialect, PlaceholderStyle};
pub use expression::{and, not, or, CompareOp, Expression};
pub use value::{SqlValue, ToSqlValue};
