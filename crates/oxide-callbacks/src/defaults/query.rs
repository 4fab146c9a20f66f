//! `oxide:query`: SELECT into the destination.

use oxide_clause::{FromTable, Select};

use crate::error::Error;
use crate::record::ReflectValue;
use crate::statement::Statement;

use super::add_primary_key_condition;

pub(super) fn query(stmt: &mut Statement<'_>) {
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
            let scanned = stmt.dest_mut().map(|dest| dest.scan(&rows));
            if let Some(Err(err)) = scanned {
                stmt.add_error(err);
            }
            if rows.is_empty() && stmt.raise_not_found {
                stmt.add_error(Error::RecordNotFound);
            }
        }
        Err(err) => stmt.add_error(err),
    }
}

/// Builds `SELECT ... FROM ...` unless SQL is already set.
///
/// A single destination with its primary key set narrows the query to that
/// row.
pub(super) fn build_query_sql(stmt: &mut Statement<'_>) {
    if !stmt.sql.is_empty() {
        return;
    }
    let Some(table) = stmt.table_name() else {
        stmt.add_error(Error::InvalidData(
            "query needs a model or a table".to_string(),
        ));
        return;
    };

    stmt.add_clause_if_absent(Select::default());
    stmt.add_clause_if_absent(FromTable::table(&table));
    if stmt.reflect_value == ReflectValue::Struct {
        add_primary_key_condition(stmt);
    }
    stmt.build_default();
}
