//! `oxide:delete`: DELETE guarded against missing conditions.

use oxide_clause::{Delete, FromTable};

use crate::error::Error;
use crate::statement::Statement;

use super::{add_primary_key_condition, has_conditions};

pub(super) fn delete(stmt: &mut Statement<'_>) {
    if stmt.error().is_some() {
        return;
    }

    if stmt.sql.is_empty() {
        let Some(table) = stmt.table_name() else {
            stmt.add_error(Error::InvalidData(
                "delete needs a model or a table".to_string(),
            ));
            return;
        };
        stmt.add_clause_if_absent(Delete);
        stmt.add_clause_if_absent(FromTable::table(&table));
        add_primary_key_condition(stmt);

        if !has_conditions(stmt) && !stmt.db().config().allow_global_update {
            stmt.add_error(Error::MissingWhereClause);
            return;
        }
        stmt.build_default();
    }

    if stmt.dry_run || stmt.error().is_some() {
        return;
    }

    match stmt.db().pool().exec(&stmt.sql, &stmt.vars) {
        Ok(result) => stmt.rows_affected = result.rows_affected,
        Err(err) => stmt.add_error(err),
    }
}
