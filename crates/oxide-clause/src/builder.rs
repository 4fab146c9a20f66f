//! The write target clauses and expressions render into.

use crate::dialect::Dialect;
use crate::value::SqlValue;

/// A sink for SQL text and bound parameters.
///
/// Clause and expression builders only ever talk to this trait, so the same
/// clause renders into a pipeline statement or a standalone [`SqlBuilder`].
pub trait Builder {
    /// Appends raw SQL text.
    fn write_str(&mut self, s: &str);

    /// Appends a single character.
    fn write_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.write_str(c.encode_utf8(&mut buf));
    }

    /// Appends a quoted identifier.
    fn write_quoted(&mut self, identifier: &str);

    /// Binds a parameter and appends its placeholder.
    fn add_var(&mut self, value: SqlValue);
}

/// A standalone builder collecting SQL and parameters.
pub struct SqlBuilder<'d> {
    dialect: &'d dyn Dialect,
    sql: String,
    vars: Vec<SqlValue>,
}

impl<'d> SqlBuilder<'d> {
    /// Creates an empty builder for the given dialect.
    #[must_use]
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            vars: Vec::new(),
        }
    }

    /// Returns the SQL written so far.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the parameters bound so far.
    #[must_use]
    pub fn vars(&self) -> &[SqlValue] {
        &self.vars
    }

    /// Consumes the builder, returning SQL and parameters.
    #[must_use]
    pub fn finish(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.vars)
    }
}

impl Builder for SqlBuilder<'_> {
    fn write_str(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    fn write_quoted(&mut self, identifier: &str) {
        self.sql.push_str(&self.dialect.quote_identifier(identifier));
    }

    fn add_var(&mut self, value: SqlValue) {
        self.vars.push(value);
        self.sql.push_str(&self.dialect.bind_var(self.vars.len()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::GenericDialect;

    #[test]
    fn test_numbered_vars_follow_position() {
        let dialect = GenericDialect::numbered();
        let mut b = SqlBuilder::new(&dialect);
        b.write_quoted("age");
        b.write_str(" BETWEEN ");
        b.add_var(SqlValue::Int(1));
        b.write_str(" AND ");
        b.add_var(SqlValue::Int(9));
        let (sql, vars) = b.finish();
        assert_eq!(sql, "\"age\" BETWEEN $1 AND $2");
        assert_eq!(vars.len(), 2);
    }
}
