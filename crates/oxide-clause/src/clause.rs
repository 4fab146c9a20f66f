//! Named SQL clauses.
//!
//! A statement keeps at most one clause per name. Adding a clause with a name
//! already present goes through [`Clause::merge`]: `WHERE` and `ORDER BY`
//! accumulate, `LIMIT` overlays, everything else replaces.

use crate::builder::Builder;
use crate::expression::{build_exprs, Expression, AND_WITH_SPACE};
use crate::value::SqlValue;

/// `INSERT INTO table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert {
    /// Target table.
    pub table: String,
    /// Optional modifier such as `OR IGNORE`.
    pub modifier: Option<String>,
}

impl Insert {
    /// Creates an insert into `table`.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            modifier: None,
        }
    }
}

/// `(columns) VALUES (...), (...)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Values {
    /// Column names.
    pub columns: Vec<String>,
    /// One entry per row, aligned with `columns`.
    pub values: Vec<Vec<SqlValue>>,
}

/// `SELECT columns`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Select {
    /// Selected columns; empty means `*`.
    pub columns: Vec<String>,
    /// Whether to emit `DISTINCT`.
    pub distinct: bool,
}

/// `FROM tables`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromTable {
    /// Source tables.
    pub tables: Vec<String>,
}

impl FromTable {
    /// Creates a `FROM` over a single table.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            tables: vec![table.into()],
        }
    }
}

/// `WHERE` conditions, joined with AND.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Where {
    /// Conditions.
    pub exprs: Vec<Expression>,
}

impl Where {
    /// Creates a `WHERE` from conditions.
    #[must_use]
    pub const fn new(exprs: Vec<Expression>) -> Self {
        Self { exprs }
    }

    fn build(&self, builder: &mut dyn Builder) {
        let mut exprs: Vec<&Expression> = match self.exprs.as_slice() {
            [Expression::And(inner)] => inner.iter().collect(),
            all => all.iter().collect(),
        };

        // A leading single-member OR would render as a dangling "OR", so the
        // first plain condition is moved to the front.
        if let Some(idx) = exprs
            .iter()
            .position(|e| !matches!(e, Expression::Or(inner) if inner.len() <= 1))
        {
            exprs.swap(0, idx);
        }

        build_exprs(builder, &exprs, AND_WITH_SPACE);
    }
}

/// `UPDATE table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// Target table.
    pub table: String,
}

/// A single `column = value` assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Column name.
    pub column: String,
    /// New value.
    pub value: SqlValue,
}

/// `SET assignments`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Set {
    /// Assignments in order.
    pub assignments: Vec<Assignment>,
}

/// `DELETE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delete;

/// A single `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByColumn {
    /// Column name.
    pub column: String,
    /// Descending order.
    pub desc: bool,
}

/// `ORDER BY columns`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderBy {
    /// Terms in order.
    pub columns: Vec<OrderByColumn>,
}

/// `LIMIT n OFFSET m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Limit {
    /// Row limit.
    pub limit: Option<u64>,
    /// Row offset.
    pub offset: Option<u64>,
}

/// `RETURNING columns`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Returning {
    /// Returned columns; empty means `*`.
    pub columns: Vec<String>,
}

/// `ON CONFLICT (columns) DO NOTHING` or `DO UPDATE SET ...`.
///
/// `update_all` asks the create step to fill the update lists from the
/// inserted columns. With nothing to update the clause renders `DO NOTHING`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OnConflict {
    /// Conflict target; empty lets the database use any unique constraint.
    pub columns: Vec<String>,
    pub do_nothing: bool,
    pub update_all: bool,
    /// Assignments with explicit values.
    pub do_updates: Vec<Assignment>,
    /// Columns taken from the proposed row, as `"c"="excluded"."c"`.
    pub update_columns: Vec<String>,
}

impl OnConflict {
    /// Ignores conflicting rows.
    #[must_use]
    pub fn do_nothing() -> Self {
        Self {
            do_nothing: true,
            ..Self::default()
        }
    }

    /// Overwrites every inserted column except keys and creation times.
    #[must_use]
    pub fn update_all() -> Self {
        Self {
            update_all: true,
            ..Self::default()
        }
    }

    /// Sets the conflict target.
    #[must_use]
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| (*c).to_string()).collect();
        self
    }

    fn build(&self, builder: &mut dyn Builder) {
        builder.write_str("ON CONFLICT ");
        if !self.columns.is_empty() {
            builder.write_char('(');
            write_columns(builder, &self.columns);
            builder.write_str(") ");
        }
        if self.do_nothing || (self.do_updates.is_empty() && self.update_columns.is_empty()) {
            builder.write_str("DO NOTHING");
            return;
        }
        builder.write_str("DO UPDATE SET ");
        for (idx, assignment) in self.do_updates.iter().enumerate() {
            if idx > 0 {
                builder.write_char(',');
            }
            builder.write_quoted(&assignment.column);
            builder.write_char('=');
            builder.add_var(assignment.value.clone());
        }
        for (idx, column) in self.update_columns.iter().enumerate() {
            if idx > 0 || !self.do_updates.is_empty() {
                builder.write_char(',');
            }
            builder.write_quoted(column);
            builder.write_char('=');
            builder.write_quoted(&format!("excluded.{column}"));
        }
    }
}

/// A named clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Insert(Insert),
    Values(Values),
    Select(Select),
    From(FromTable),
    Where(Where),
    Update(Update),
    Set(Set),
    Delete(Delete),
    OrderBy(OrderBy),
    Limit(Limit),
    Returning(Returning),
    OnConflict(OnConflict),
}

impl Clause {
    /// Returns the clause name used as the statement key.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Insert(_) => "INSERT",
            Self::Values(_) => "VALUES",
            Self::Select(_) => "SELECT",
            Self::From(_) => "FROM",
            Self::Where(_) => "WHERE",
            Self::Update(_) => "UPDATE",
            Self::Set(_) => "SET",
            Self::Delete(_) => "DELETE",
            Self::OrderBy(_) => "ORDER BY",
            Self::Limit(_) => "LIMIT",
            Self::Returning(_) => "RETURNING",
            Self::OnConflict(_) => "ON CONFLICT",
        }
    }

    /// Returns whether building this clause would write nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Where(w) => w.exprs.is_empty(),
            Self::Set(s) => s.assignments.is_empty(),
            Self::OrderBy(o) => o.columns.is_empty(),
            Self::Limit(l) => l.limit.is_none() && l.offset.is_none(),
            _ => false,
        }
    }

    /// Combines this clause with the one already stored under the same name.
    #[must_use]
    pub fn merge(self, existing: Option<Self>) -> Self {
        match (self, existing) {
            (Self::Where(new), Some(Self::Where(mut old))) => {
                old.exprs.extend(new.exprs);
                Self::Where(old)
            }
            (Self::OrderBy(new), Some(Self::OrderBy(mut old))) => {
                old.columns.extend(new.columns);
                Self::OrderBy(old)
            }
            (Self::Limit(new), Some(Self::Limit(old))) => Self::Limit(Limit {
                limit: new.limit.or(old.limit),
                offset: new.offset.or(old.offset),
            }),
            (new, _) => new,
        }
    }

    /// Renders the clause, keyword included.
    pub fn build(&self, builder: &mut dyn Builder) {
        match self {
            Self::Insert(insert) => {
                builder.write_str("INSERT ");
                if let Some(modifier) = &insert.modifier {
                    builder.write_str(modifier);
                    builder.write_char(' ');
                }
                builder.write_str("INTO ");
                builder.write_quoted(&insert.table);
            }
            Self::Values(values) => {
                if values.columns.is_empty() {
                    builder.write_str("DEFAULT VALUES");
                    return;
                }
                builder.write_char('(');
                write_columns(builder, &values.columns);
                builder.write_str(") VALUES ");
                for (row_idx, row) in values.values.iter().enumerate() {
                    if row_idx > 0 {
                        builder.write_char(',');
                    }
                    builder.write_char('(');
                    for (idx, value) in row.iter().enumerate() {
                        if idx > 0 {
                            builder.write_char(',');
                        }
                        builder.add_var(value.clone());
                    }
                    builder.write_char(')');
                }
            }
            Self::Select(select) => {
                builder.write_str("SELECT ");
                if select.distinct {
                    builder.write_str("DISTINCT ");
                }
                if select.columns.is_empty() {
                    builder.write_char('*');
                } else {
                    write_columns(builder, &select.columns);
                }
            }
            Self::From(from) => {
                builder.write_str("FROM ");
                write_columns(builder, &from.tables);
            }
            Self::Where(w) => {
                builder.write_str("WHERE ");
                w.build(builder);
            }
            Self::Update(update) => {
                builder.write_str("UPDATE ");
                builder.write_quoted(&update.table);
            }
            Self::Set(set) => {
                builder.write_str("SET ");
                for (idx, assignment) in set.assignments.iter().enumerate() {
                    if idx > 0 {
                        builder.write_char(',');
                    }
                    builder.write_quoted(&assignment.column);
                    builder.write_char('=');
                    builder.add_var(assignment.value.clone());
                }
            }
            Self::Delete(_) => builder.write_str("DELETE"),
            Self::OrderBy(order) => {
                builder.write_str("ORDER BY ");
                for (idx, term) in order.columns.iter().enumerate() {
                    if idx > 0 {
                        builder.write_char(',');
                    }
                    builder.write_quoted(&term.column);
                    if term.desc {
                        builder.write_str(" DESC");
                    }
                }
            }
            Self::Limit(limit) => {
                if let Some(n) = limit.limit {
                    builder.write_str(&format!("LIMIT {n}"));
                }
                if let Some(offset) = limit.offset {
                    if limit.limit.is_some() {
                        builder.write_char(' ');
                    }
                    builder.write_str(&format!("OFFSET {offset}"));
                }
            }
            Self::Returning(returning) => {
                builder.write_str("RETURNING ");
                if returning.columns.is_empty() {
                    builder.write_char('*');
                } else {
                    write_columns(builder, &returning.columns);
                }
            }
            Self::OnConflict(on_conflict) => on_conflict.build(builder),
        }
    }
}

fn write_columns(builder: &mut dyn Builder, columns: &[String]) {
    for (idx, column) in columns.iter().enumerate() {
        if idx > 0 {
            builder.write_char(',');
        }
        builder.write_quoted(column);
    }
}

macro_rules! impl_into_clause {
    ($($ty:ident => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Clause {
                fn from(c: $ty) -> Self {
                    Self::$variant(c)
                }
            }
        )+
    };
}

impl_into_clause!(
    Insert => Insert,
    Values => Values,
    Select => Select,
    FromTable => From,
    Where => Where,
    Update => Update,
    Set => Set,
    Delete => Delete,
    OrderBy => OrderBy,
    Limit => Limit,
    Returning => Returning,
    OnConflict => OnConflict,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SqlBuilder;
    use crate::dialect::GenericDialect;
    use crate::expression::or;

    fn render(clause: &Clause) -> (String, Vec<SqlValue>) {
        let dialect = GenericDialect::new();
        let mut b = SqlBuilder::new(&dialect);
        clause.build(&mut b);
        b.finish()
    }

    #[test]
    fn test_where_joins_with_and() {
        let clause = Clause::from(Where::new(vec![
            Expression::eq("id", 1),
            Expression::raw("age > ?", vec![SqlValue::Int(18)]),
        ]));
        let (sql, vars) = render(&clause);
        assert_eq!(sql, "WHERE \"id\" = ? AND age > ?");
        assert_eq!(vars, vec![SqlValue::Int(1), SqlValue::Int(18)]);
    }

    #[test]
    fn test_where_moves_single_or_behind_plain_condition() {
        let clause = Clause::from(Where::new(vec![
            or(vec![Expression::eq("a", 1)]),
            Expression::eq("b", 2),
        ]));
        let (sql, vars) = render(&clause);
        assert_eq!(sql, "WHERE \"b\" = ? OR \"a\" = ?");
        assert_eq!(vars, vec![SqlValue::Int(2), SqlValue::Int(1)]);
    }

    #[test]
    fn test_where_unwraps_single_and() {
        let clause = Clause::from(Where::new(vec![crate::expression::and(vec![
            Expression::eq("a", 1),
            or(vec![Expression::eq("b", 2), Expression::eq("c", 3)]),
        ])]));
        let (sql, _) = render(&clause);
        assert_eq!(sql, "WHERE \"a\" = ? AND (\"b\" = ? OR \"c\" = ?)");
    }

    #[test]
    fn test_where_merge_appends() {
        let first = Clause::from(Where::new(vec![Expression::eq("a", 1)]));
        let merged = Clause::from(Where::new(vec![Expression::eq("b", 2)])).merge(Some(first));
        let (sql, _) = render(&merged);
        assert_eq!(sql, "WHERE \"a\" = ? AND \"b\" = ?");
    }

    #[test]
    fn test_values_multiple_rows() {
        let clause = Clause::from(Values {
            columns: vec!["name".into(), "age".into()],
            values: vec![
                vec![SqlValue::from("a"), SqlValue::Int(1)],
                vec![SqlValue::from("b"), SqlValue::Int(2)],
            ],
        });
        let (sql, vars) = render(&clause);
        assert_eq!(sql, "(\"name\",\"age\") VALUES (?,?),(?,?)");
        assert_eq!(vars.len(), 4);
    }

    #[test]
    fn test_empty_values_is_default_values() {
        let (sql, _) = render(&Clause::from(Values::default()));
        assert_eq!(sql, "DEFAULT VALUES");
    }

    #[test]
    fn test_limit_overlay() {
        let merged = Clause::from(Limit {
            limit: None,
            offset: Some(20),
        })
        .merge(Some(Clause::from(Limit {
            limit: Some(10),
            offset: None,
        })));
        let (sql, _) = render(&merged);
        assert_eq!(sql, "LIMIT 10 OFFSET 20");
    }

    #[test]
    fn test_other_clauses_replace() {
        let merged = Clause::from(Update {
            table: "b".into(),
        })
        .merge(Some(Clause::from(Update {
            table: "a".into(),
        })));
        assert_eq!(render(&merged).0, "UPDATE \"b\"");
    }

    #[test]
    fn test_on_conflict_do_nothing() {
        let clause = Clause::from(OnConflict::do_nothing().columns(&["email"]));
        assert_eq!(clause.name(), "ON CONFLICT");
        assert_eq!(render(&clause).0, "ON CONFLICT (\"email\") DO NOTHING");
    }

    #[test]
    fn test_on_conflict_do_update() {
        let clause = Clause::from(OnConflict {
            columns: vec!["id".into()],
            do_updates: vec![Assignment {
                column: "hits".into(),
                value: SqlValue::Int(0),
            }],
            update_columns: vec!["name".into(), "age".into()],
            ..OnConflict::default()
        });
        let (sql, vars) = render(&clause);
        assert_eq!(
            sql,
            "ON CONFLICT (\"id\") DO UPDATE SET \"hits\"=?,\"name\"=\"excluded\".\"name\",\"age\"=\"excluded\".\"age\""
        );
        assert_eq!(vars, vec![SqlValue::Int(0)]);
    }

    #[test]
    fn test_on_conflict_without_updates_does_nothing() {
        let (sql, _) = render(&Clause::from(OnConflict::update_all()));
        assert_eq!(sql, "ON CONFLICT DO NOTHING");
    }
}
