//! Condition expressions for `WHERE` clauses.
//!
//! Expressions compose with [`and`], [`or`] and [`not`]. Rendering decides
//! parenthesization from the shape of the tree:
//!
//! - an `AND`/`OR` group with more than one member is wrapped,
//! - a raw SQL fragment containing ` AND ` or ` OR ` is wrapped when it sits
//!   next to siblings,
//! - a one-member `OR` group joins its left neighbour with ` OR `,
//! - `NOT` over comparisons flips the operator instead of prefixing `NOT`.

use std::fmt;

use crate::builder::Builder;
use crate::value::{SqlValue, ToSqlValue};

pub(crate) const AND_WITH_SPACE: &str = " AND ";
pub(crate) const OR_WITH_SPACE: &str = " OR ";

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal (=)
    Eq,
    /// Not equal (<>)
    Ne,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Gte,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Lte,
}

impl CompareOp {
    /// Returns the operator matching the negated comparison.
    #[must_use]
    pub const fn negate(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Gt => Self::Lte,
            Self::Gte => Self::Lt,
            Self::Lt => Self::Gte,
            Self::Lte => Self::Gt,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "<>"),
            Self::Gt => write!(f, ">"),
            Self::Gte => write!(f, ">="),
            Self::Lt => write!(f, "<"),
            Self::Lte => write!(f, "<="),
        }
    }
}

/// A condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Raw SQL; each `?` binds the next value of `vars`.
    Raw { sql: String, vars: Vec<SqlValue> },
    /// Simple comparison: column op value.
    Compare {
        column: String,
        op: CompareOp,
        value: SqlValue,
    },
    /// IN list check.
    InList {
        column: String,
        values: Vec<SqlValue>,
    },
    /// IS NULL check.
    IsNull { column: String },
    /// AND combination.
    And(Vec<Expression>),
    /// OR combination.
    Or(Vec<Expression>),
    /// NOT negation of the AND of its members.
    Not(Vec<Expression>),
}

impl Expression {
    /// Creates a raw SQL expression.
    pub fn raw(sql: impl Into<String>, vars: Vec<SqlValue>) -> Self {
        Self::Raw {
            sql: sql.into(),
            vars,
        }
    }

    /// Creates an equality comparison (column = value).
    pub fn eq<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    /// Creates an inequality comparison (column <> value).
    pub fn ne<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::compare(column, CompareOp::Ne, value)
    }

    /// Creates a greater-than comparison.
    pub fn gt<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    /// Creates a greater-than-or-equal comparison.
    pub fn gte<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::compare(column, CompareOp::Gte, value)
    }

    /// Creates a less-than comparison.
    pub fn lt<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::compare(column, CompareOp::Lt, value)
    }

    /// Creates a less-than-or-equal comparison.
    pub fn lte<V: ToSqlValue>(column: &str, value: V) -> Self {
        Self::compare(column, CompareOp::Lte, value)
    }

    /// Creates a comparison with an explicit operator.
    pub fn compare<V: ToSqlValue>(column: &str, op: CompareOp, value: V) -> Self {
        Self::Compare {
            column: column.to_string(),
            op,
            value: value.to_sql_value(),
        }
    }

    /// Creates an IN list check.
    pub fn in_list<V: ToSqlValue>(column: &str, values: Vec<V>) -> Self {
        Self::InList {
            column: column.to_string(),
            values: values.into_iter().map(ToSqlValue::to_sql_value).collect(),
        }
    }

    /// Creates an IS NULL check.
    pub fn is_null(column: &str) -> Self {
        Self::IsNull {
            column: column.to_string(),
        }
    }

    /// Renders the expression.
    pub fn build(&self, builder: &mut dyn Builder) {
        match self {
            Self::Raw { sql, vars } => build_raw(builder, sql, vars),
            Self::Compare { column, op, value } => build_compare(builder, column, *op, value),
            Self::InList { column, values } => build_in(builder, column, values, false),
            Self::IsNull { column } => {
                builder.write_quoted(column);
                builder.write_str(" IS NULL");
            }
            Self::And(exprs) => build_group(builder, exprs, AND_WITH_SPACE),
            Self::Or(exprs) => build_group(builder, exprs, OR_WITH_SPACE),
            Self::Not(exprs) => build_not(builder, exprs),
        }
    }

    const fn is_negatable(&self) -> bool {
        matches!(
            self,
            Self::Compare { .. } | Self::InList { .. } | Self::IsNull { .. }
        )
    }

    fn build_negation(&self, builder: &mut dyn Builder) {
        match self {
            Self::Compare { column, op, value } => {
                build_compare(builder, column, op.negate(), value);
            }
            Self::InList { column, values } => build_in(builder, column, values, true),
            Self::IsNull { column } => {
                builder.write_quoted(column);
                builder.write_str(" IS NOT NULL");
            }
            other => {
                builder.write_str("NOT ");
                other.build(builder);
            }
        }
    }

    /// Whether this is a raw fragment carrying its own AND/OR.
    fn is_compound_raw(&self) -> bool {
        match self {
            Self::Raw { sql, .. } => {
                let sql = sql.to_uppercase();
                sql.contains(AND_WITH_SPACE) || sql.contains(OR_WITH_SPACE)
            }
            _ => false,
        }
    }

    fn is_single_or(&self) -> bool {
        matches!(self, Self::Or(exprs) if exprs.len() == 1)
    }
}

/// Combines expressions with AND.
///
/// A single non-OR expression is returned unchanged.
#[must_use]
pub fn and(mut exprs: Vec<Expression>) -> Expression {
    if exprs.len() == 1 && !matches!(exprs[0], Expression::Or(_)) {
        return exprs.remove(0);
    }
    Expression::And(exprs)
}

/// Combines expressions with OR.
#[must_use]
pub fn or(exprs: Vec<Expression>) -> Expression {
    Expression::Or(exprs)
}

/// Negates the conjunction of `exprs`.
#[must_use]
pub fn not(mut exprs: Vec<Expression>) -> Expression {
    if exprs.len() == 1 {
        if let Expression::And(inner) = &mut exprs[0] {
            let inner = std::mem::take(inner);
            return Expression::Not(inner);
        }
    }
    Expression::Not(exprs)
}

/// Joins sibling expressions, wrapping members that need it.
pub(crate) fn build_exprs(builder: &mut dyn Builder, exprs: &[&Expression], join: &str) {
    for (idx, expr) in exprs.iter().enumerate() {
        if idx > 0 {
            if expr.is_single_or() {
                builder.write_str(OR_WITH_SPACE);
            } else {
                builder.write_str(join);
            }
        }

        let wrap = exprs.len() > 1
            && match expr {
                Expression::Or(inner) | Expression::And(inner) if inner.len() == 1 => {
                    inner[0].is_compound_raw()
                }
                other => other.is_compound_raw(),
            };

        if wrap {
            builder.write_char('(');
            expr.build(builder);
            builder.write_char(')');
        } else {
            expr.build(builder);
        }
    }
}

fn build_group(builder: &mut dyn Builder, exprs: &[Expression], join: &str) {
    let refs: Vec<&Expression> = exprs.iter().collect();
    if refs.len() > 1 {
        builder.write_char('(');
        build_exprs(builder, &refs, join);
        builder.write_char(')');
    } else {
        build_exprs(builder, &refs, join);
    }
}

fn build_not(builder: &mut dyn Builder, exprs: &[Expression]) {
    let multiple = exprs.len() > 1;

    if exprs.iter().any(Expression::is_negatable) {
        if multiple {
            builder.write_char('(');
        }
        for (idx, expr) in exprs.iter().enumerate() {
            if idx > 0 {
                builder.write_str(AND_WITH_SPACE);
            }
            if expr.is_negatable() {
                expr.build_negation(builder);
            } else {
                builder.write_str("NOT ");
                build_wrapped_raw(builder, expr);
            }
        }
        if multiple {
            builder.write_char(')');
        }
    } else {
        builder.write_str("NOT ");
        if multiple {
            builder.write_char('(');
        }
        for (idx, expr) in exprs.iter().enumerate() {
            if idx > 0 {
                if matches!(expr, Expression::Or(_)) {
                    builder.write_str(OR_WITH_SPACE);
                } else {
                    builder.write_str(AND_WITH_SPACE);
                }
            }
            build_wrapped_raw(builder, expr);
        }
        if multiple {
            builder.write_char(')');
        }
    }
}

fn build_wrapped_raw(builder: &mut dyn Builder, expr: &Expression) {
    if expr.is_compound_raw() {
        builder.write_char('(');
        expr.build(builder);
        builder.write_char(')');
    } else {
        expr.build(builder);
    }
}

fn build_raw(builder: &mut dyn Builder, sql: &str, vars: &[SqlValue]) {
    let mut vars = vars.iter();
    let mut start = 0;
    for (idx, c) in sql.char_indices() {
        if c == '?' {
            if let Some(value) = vars.next() {
                builder.write_str(&sql[start..idx]);
                builder.add_var(value.clone());
                start = idx + 1;
            }
        }
    }
    builder.write_str(&sql[start..]);
}

fn build_compare(builder: &mut dyn Builder, column: &str, op: CompareOp, value: &SqlValue) {
    builder.write_quoted(column);
    match (op, value) {
        (CompareOp::Eq, SqlValue::Null) => builder.write_str(" IS NULL"),
        (CompareOp::Ne, SqlValue::Null) => builder.write_str(" IS NOT NULL"),
        _ => {
            builder.write_str(&format!(" {op} "));
            builder.add_var(value.clone());
        }
    }
}

fn build_in(builder: &mut dyn Builder, column: &str, values: &[SqlValue], negated: bool) {
    builder.write_quoted(column);
    builder.write_str(if negated { " NOT IN (" } else { " IN (" });
    if values.is_empty() {
        builder.write_str("NULL");
    }
    for (idx, value) in values.iter().enumerate() {
        if idx > 0 {
            builder.write_char(',');
        }
        builder.add_var(value.clone());
    }
    builder.write_char(')');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SqlBuilder;
    use crate::dialect::GenericDialect;

    fn render(expr: &Expression) -> (String, Vec<SqlValue>) {
        let dialect = GenericDialect::new();
        let mut b = SqlBuilder::new(&dialect);
        expr.build(&mut b);
        b.finish()
    }

    #[test]
    fn test_simple_eq() {
        let (sql, vars) = render(&Expression::eq("status", "active"));
        assert_eq!(sql, "\"status\" = ?");
        assert_eq!(vars, vec![SqlValue::from("active")]);
    }

    #[test]
    fn test_eq_null_renders_is_null() {
        let (sql, vars) = render(&Expression::eq("deleted_at", SqlValue::Null));
        assert_eq!(sql, "\"deleted_at\" IS NULL");
        assert!(vars.is_empty());
    }

    #[test]
    fn test_raw_binds_in_order() {
        let (sql, vars) = render(&Expression::raw(
            "age > ? AND age < ?",
            vec![SqlValue::Int(18), SqlValue::Int(65)],
        ));
        assert_eq!(sql, "age > ? AND age < ?");
        assert_eq!(vars, vec![SqlValue::Int(18), SqlValue::Int(65)]);
    }

    #[test]
    fn test_or_group_is_wrapped() {
        let expr = or(vec![
            Expression::eq("role", "admin"),
            Expression::eq("role", "moderator"),
        ]);
        let (sql, _) = render(&expr);
        assert_eq!(sql, "(\"role\" = ? OR \"role\" = ?)");
    }

    #[test]
    fn test_and_of_single_is_unwrapped() {
        let expr = and(vec![Expression::eq("id", 1)]);
        assert_eq!(expr, Expression::eq("id", 1));
    }

    #[test]
    fn test_compound_raw_sibling_is_wrapped() {
        let expr = and(vec![
            Expression::raw("a = 1 or b = 2", vec![]),
            Expression::eq("c", 3),
        ]);
        let (sql, _) = render(&expr);
        assert_eq!(sql, "((a = 1 or b = 2) AND \"c\" = ?)");
    }

    #[test]
    fn test_not_negates_comparisons() {
        let expr = not(vec![
            Expression::eq("status", "banned"),
            Expression::in_list("id", vec![1, 2]),
        ]);
        let (sql, vars) = render(&expr);
        assert_eq!(sql, "(\"status\" <> ? AND \"id\" NOT IN (?,?))");
        assert_eq!(vars.len(), 3);
    }

    #[test]
    fn test_not_of_raw_prefixes_not() {
        let expr = not(vec![
            Expression::raw("x > 1 AND y < 2", vec![]),
            Expression::raw("z = 3", vec![]),
        ]);
        let (sql, _) = render(&expr);
        assert_eq!(sql, "NOT ((x > 1 AND y < 2) AND z = 3)");
    }

    #[test]
    fn test_not_unwraps_single_and() {
        let expr = not(vec![and(vec![
            Expression::gt("age", 18),
            Expression::is_null("deleted_at"),
        ])]);
        let (sql, _) = render(&expr);
        assert_eq!(sql, "(\"age\" <= ? AND \"deleted_at\" IS NOT NULL)");
    }

    #[test]
    fn test_empty_in_list() {
        let (sql, vars) = render(&Expression::in_list::<i64>("id", vec![]));
        assert_eq!(sql, "\"id\" IN (NULL)");
        assert!(vars.is_empty());
    }
}
