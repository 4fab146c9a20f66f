//! The per-operation statement context every step reads and writes.

use std::collections::HashMap;

use oxide_clause::{
    Assignment, Builder, Clause, Expression, Limit, OrderBy, OrderByColumn, Select, SqlValue,
    ToSqlValue, Where,
};

use crate::database::Database;
use crate::error::{Error, Result};
use crate::pool::Rows;
use crate::record::{ReflectValue, Record, Schema};
use crate::stage::StageKind;

/// A deferred statement modification, applied when the statement executes.
pub type Scope<'a> = Box<dyn FnOnce(&mut Statement<'a>) + 'a>;

/// Model or destination. `Alias` points at the other one.
pub(crate) enum Slot<'a> {
    Value(&'a mut dyn Record),
    Alias,
}

/// State of one database operation.
///
/// Built by chaining on [`Database::session`] and consumed by a finisher
/// such as [`Statement::find`], which runs the matching stage and hands the
/// statement back with its outcome.
pub struct Statement<'a> {
    db: &'a Database,
    error: Option<Error>,
    pub rows_affected: u64,
    /// Explicit table name, taking precedence over the model's.
    pub table: Option<String>,
    pub schema: Option<Schema>,
    pub sql: String,
    pub vars: Vec<SqlValue>,
    clauses: HashMap<&'static str, Clause>,
    /// Clause names rendered by [`Statement::build_default`], in order.
    pub build_clauses: Vec<String>,
    model: Option<Slot<'a>>,
    dest: Option<Slot<'a>>,
    pub reflect_value: ReflectValue,
    scopes: Vec<Scope<'a>>,
    pub dry_run: bool,
    pub skip_hooks: bool,
    /// Report [`Error::RecordNotFound`] when a query returns no rows.
    pub raise_not_found: bool,
    /// Columns to set on update.
    pub assignments: Vec<Assignment>,
    /// Result set of a row query.
    pub rows: Option<Rows>,
}

impl<'a> Statement<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self {
            db,
            error: None,
            rows_affected: 0,
            table: None,
            schema: None,
            sql: String::new(),
            vars: Vec::new(),
            clauses: HashMap::new(),
            build_clauses: Vec::new(),
            model: None,
            dest: None,
            reflect_value: ReflectValue::Invalid,
            scopes: Vec::new(),
            dry_run: db.config().dry_run,
            skip_hooks: db.config().skip_hooks,
            raise_not_found: false,
            assignments: Vec::new(),
            rows: None,
        }
    }

    pub const fn db(&self) -> &'a Database {
        self.db
    }

    // ==================== Errors ====================

    pub const fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Records an error, keeping any recorded before.
    pub fn add_error(&mut self, err: impl Into<Error>) {
        let err = err.into();
        self.error = Some(match self.error.take() {
            Some(existing) => existing.join(err),
            None => err,
        });
    }

    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    /// Rows affected, or the accumulated error.
    pub fn into_result(self) -> Result<u64> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.rows_affected),
        }
    }

    // ==================== Model and destination ====================

    /// The model, or the destination standing in for it.
    pub fn model_record(&self) -> Option<&(dyn Record + 'a)> {
        match &self.model {
            Some(Slot::Value(record)) => Some(&**record),
            Some(Slot::Alias) => match &self.dest {
                Some(Slot::Value(record)) => Some(&**record),
                _ => None,
            },
            None => None,
        }
    }

    /// The destination, or the model standing in for it.
    pub fn dest(&self) -> Option<&(dyn Record + 'a)> {
        match &self.dest {
            Some(Slot::Value(record)) => Some(&**record),
            Some(Slot::Alias) => match &self.model {
                Some(Slot::Value(record)) => Some(&**record),
                _ => None,
            },
            None => None,
        }
    }

    pub fn dest_mut(&mut self) -> Option<&mut (dyn Record + 'a)> {
        match &mut self.dest {
            Some(Slot::Value(record)) => Some(&mut **record),
            Some(Slot::Alias) => match &mut self.model {
                Some(Slot::Value(record)) => Some(&mut **record),
                _ => None,
            },
            None => None,
        }
    }

    /// The explicit table, or the model's.
    pub fn table_name(&self) -> Option<String> {
        self.table
            .clone()
            .or_else(|| self.schema.as_ref().map(|s| s.table.clone()))
    }

    // ==================== Clauses ====================

    pub fn clause(&self, name: &str) -> Option<&Clause> {
        self.clauses.get(name)
    }

    /// Adds a clause, merging it with one of the same name.
    pub fn add_clause(&mut self, clause: impl Into<Clause>) {
        let clause = clause.into();
        let name = clause.name();
        let existing = self.clauses.remove(name);
        self.clauses.insert(name, clause.merge(existing));
    }

    /// Adds a clause unless one of the same name is already set.
    pub fn add_clause_if_absent(&mut self, clause: impl Into<Clause>) {
        let clause = clause.into();
        self.clauses.entry(clause.name()).or_insert(clause);
    }

    /// Renders the named clauses into the SQL buffer, skipping absent and
    /// empty ones.
    pub fn build(&mut self, names: &[String]) {
        let clauses = std::mem::take(&mut self.clauses);
        let mut first = true;
        for name in names {
            let Some(clause) = clauses.get(name.as_str()) else {
                continue;
            };
            if clause.is_empty() {
                continue;
            }
            if !first {
                self.write_char(' ');
            }
            first = false;
            clause.build(self);
        }
        self.clauses = clauses;
    }

    /// Renders [`Statement::build_clauses`].
    pub fn build_default(&mut self) {
        let names = self.build_clauses.clone();
        self.build(&names);
    }

    // ==================== Chain methods ====================

    /// Sets the table explicitly.
    #[must_use]
    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    /// Sets the model the operation is about.
    #[must_use]
    pub fn model(mut self, model: &'a mut dyn Record) -> Self {
        self.model = Some(Slot::Value(model));
        self
    }

    /// Adds a WHERE condition.
    #[must_use]
    pub fn where_expr(mut self, expr: Expression) -> Self {
        self.add_clause(Where::new(vec![expr]));
        self
    }

    /// Adds a raw WHERE condition; each `?` binds the next value.
    #[must_use]
    pub fn where_raw(self, sql: &str, vars: Vec<SqlValue>) -> Self {
        self.where_expr(Expression::raw(sql, vars))
    }

    #[must_use]
    pub fn order(mut self, column: &str, desc: bool) -> Self {
        self.add_clause(OrderBy {
            columns: vec![OrderByColumn {
                column: column.to_string(),
                desc,
            }],
        });
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.add_clause(Limit {
            limit: Some(limit),
            offset: None,
        });
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.add_clause(Limit {
            limit: None,
            offset: Some(offset),
        });
        self
    }

    #[must_use]
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.add_clause(Select {
            columns: columns.iter().map(ToString::to_string).collect(),
            distinct: false,
        });
        self
    }

    /// Defers `scope` until the statement executes.
    #[must_use]
    pub fn scopes(mut self, scope: impl FnOnce(&mut Self) + 'a) -> Self {
        self.add_scope(scope);
        self
    }

    /// Queues another scope. Scopes may call this while being applied.
    pub fn add_scope(&mut self, scope: impl FnOnce(&mut Self) + 'a) {
        self.scopes.push(Box::new(scope));
    }

    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    #[must_use]
    pub fn skip_hooks(mut self) -> Self {
        self.skip_hooks = true;
        self
    }

    /// Queues `column = value` for the next update.
    #[must_use]
    pub fn assign(mut self, column: &str, value: impl ToSqlValue) -> Self {
        self.assignments.push(Assignment {
            column: column.to_string(),
            value: value.to_sql_value(),
        });
        self
    }

    /// Sets raw SQL; each `?` binds the next value.
    #[must_use]
    pub fn raw(mut self, sql: &str, vars: Vec<SqlValue>) -> Self {
        self.sql.clear();
        self.vars.clear();
        Expression::raw(sql, vars).build(&mut self);
        self
    }

    // ==================== Finishers ====================

    fn run(self, kind: StageKind) -> Self {
        let db = self.db;
        db.callbacks().stage(kind).execute(self)
    }

    /// Inserts `value`.
    pub fn create(mut self, value: &'a mut dyn Record) -> Self {
        self.dest = Some(Slot::Value(value));
        self.run(StageKind::Create)
    }

    /// Loads matching rows into `dest`.
    pub fn find(mut self, dest: &'a mut dyn Record) -> Self {
        self.dest = Some(Slot::Value(dest));
        self.run(StageKind::Query)
    }

    /// Loads the first row by primary key into `dest`, reporting
    /// [`Error::RecordNotFound`] when there is none.
    pub fn first(mut self, dest: &'a mut dyn Record) -> Self {
        self.raise_not_found = true;
        let primary = dest
            .parse_schema()
            .ok()
            .and_then(|schema| schema.primary_field().map(|f| f.name.clone()));
        if let Some(column) = primary {
            self = self.order(&column, false);
        }
        self.limit(1).find(dest)
    }

    /// Sets one column on the matching rows.
    pub fn update(self, column: &str, value: impl ToSqlValue) -> Self {
        self.assign(column, value).run(StageKind::Update)
    }

    /// Sets several columns on the matching rows. Without assignments, every
    /// column of the model is saved.
    pub fn updates(mut self, assignments: Vec<Assignment>) -> Self {
        self.assignments.extend(assignments);
        self.run(StageKind::Update)
    }

    /// Deletes the model, or the rows matching the conditions.
    pub fn delete(self) -> Self {
        self.run(StageKind::Delete)
    }

    /// Runs a query, leaving its result set in [`Statement::rows`].
    pub fn rows(self) -> Self {
        self.run(StageKind::Row)
    }

    /// Executes raw SQL set with [`Statement::raw`].
    pub fn exec(self) -> Self {
        self.run(StageKind::Raw)
    }

    // ==================== Harness support ====================

    pub(crate) fn apply_scopes(&mut self) {
        while !self.scopes.is_empty() {
            for scope in std::mem::take(&mut self.scopes) {
                scope(&mut *self);
            }
        }
    }

    /// Lets a destination implementing [`StatementModifier`] adjust the
    /// statement. The destination itself cannot be replaced from there.
    ///
    /// [`StatementModifier`]: crate::StatementModifier
    pub(crate) fn apply_statement_modifier(&mut self) {
        match self.dest.take() {
            Some(Slot::Value(dest)) => {
                if let Some(modifier) = dest.statement_modifier() {
                    modifier.modify_statement(self);
                }
                self.dest = Some(Slot::Value(dest));
            }
            other => self.dest = other,
        }
    }

    pub(crate) fn normalize_targets(&mut self) {
        if self.model.is_none() {
            if self.dest.is_some() {
                self.model = Some(Slot::Alias);
            }
        } else if self.dest.is_none() {
            self.dest = Some(Slot::Alias);
        }
    }

    pub(crate) fn parse_model(&mut self) {
        let Some(parsed) = self.model_record().map(|model| model.parse_schema()) else {
            return;
        };
        match parsed {
            Ok(schema) => self.schema = Some(schema),
            Err(Error::UnsupportedDataType(what)) => {
                if self.table.is_none() && self.sql.is_empty() {
                    self.add_error(Error::TableNotSet(what));
                }
            }
            Err(err) => self.add_error(err),
        }
    }

    pub(crate) fn resolve_destination(&mut self) {
        let Some(resolved) = self.dest_mut().map(|dest| dest.resolve()) else {
            return;
        };
        self.reflect_value = resolved;
        if resolved == ReflectValue::Invalid {
            self.add_error(Error::InvalidValue);
        }
    }
}

impl Builder for Statement<'_> {
    fn write_str(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    fn write_quoted(&mut self, identifier: &str) {
        let quoted = self.db.dialect().quote_identifier(identifier);
        self.sql.push_str(&quoted);
    }

    fn add_var(&mut self, value: SqlValue) {
        self.vars.push(value);
        let placeholder = self.db.dialect().bind_var(self.vars.len());
        self.sql.push_str(&placeholder);
    }
}
