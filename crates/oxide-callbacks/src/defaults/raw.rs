//! `oxide:row` and `oxide:raw`.

use crate::statement::Statement;

use super::query::build_query_sql;

/// Runs the query and keeps the raw rows on the statement.
pub(super) fn row(stmt: &mut Statement<'_>) {
    if stmt.error().is_some() {
        return;
    }

    build_query_sql(stmt);

    if stmt.dry_run || stmt.error().is_some() {
        return;
    }

    match stmt.db().pool().query(&stmt.sql, &stmt.vars) {
        Ok(rows) => {
            stmt.rows_affected = rows.len() as u64;
            stmt.rows = Some(rows);
        }
        Err(err) => stmt.add_error(err),
    }
}

pub(super) fn raw(stmt: &mut Statement<'_>) {
    if stmt.error().is_some() || stmt.dry_run {
        return;
    }

    match stmt.db().pool().exec(&stmt.sql, &stmt.vars) {
        Ok(result) => stmt.rows_affected = result.rows_affected,
        Err(err) => stmt.add_error(err),
    }
}
