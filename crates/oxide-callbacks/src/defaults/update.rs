//! `oxide:update`: UPDATE guarded against missing conditions.

use oxide_clause::{Assignment, Set, SqlValue, Update};

use crate::error::{Error, Result};
use crate::record::ReflectValue;
use crate::statement::Statement;

use super::{add_primary_key_condition, has_conditions};

pub(super) fn update(stmt: &mut Statement<'_>) {
    if stmt.error().is_some() {
        return;
    }

    if stmt.sql.is_empty() {
        let Some(table) = stmt.table_name() else {
            stmt.add_error(Error::InvalidData(
                "update needs a model or a table".to_string(),
            ));
            return;
        };
        stmt.add_clause_if_absent(Update { table });

        let set = match convert_to_assignments(stmt) {
            Ok(set) => set,
            Err(err) => {
                stmt.add_error(err);
                return;
            }
        };
        if set.assignments.is_empty() {
            return;
        }
        stmt.add_clause(set);
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

/// Turns queued assignments into a `SET`, mirroring them onto the
/// destination and stamping auto-update columns.
///
/// With nothing queued, a single record saves its non-zero columns.
fn convert_to_assignments(stmt: &mut Statement<'_>) -> Result<Set> {
    let now = SqlValue::Timestamp(stmt.db().now());
    let reflect = stmt.reflect_value;
    let schema = stmt.schema.clone();
    let mut assignments = stmt.assignments.clone();

    let Some(schema) = schema else {
        return Ok(Set { assignments });
    };
    let Some(dest) = stmt.dest_mut() else {
        return Ok(Set { assignments });
    };

    if assignments.is_empty() {
        if reflect != ReflectValue::Struct {
            return Err(Error::InvalidData(
                "saving every column needs a single record".to_string(),
            ));
        }
        for field in &schema.fields {
            if field.primary_key || field.auto_create_time {
                continue;
            }
            let value = if field.auto_update_time {
                dest.set_field_value(0, &field.name, now.clone())?;
                Some(now.clone())
            } else {
                dest.field_value(0, &field.name)
            };
            if let Some(value) = value.filter(|value| !value.is_zero()) {
                assignments.push(Assignment {
                    column: field.name.clone(),
                    value,
                });
            }
        }
        return Ok(Set { assignments });
    }

    for field in schema.fields.iter().filter(|field| field.auto_update_time) {
        if !assignments.iter().any(|a| a.column == field.name) {
            assignments.push(Assignment {
                column: field.name.clone(),
                value: now.clone(),
            });
        }
    }
    for row in 0..dest.len() {
        for assignment in &assignments {
            if schema.lookup(&assignment.column).is_some() {
                dest.set_field_value(row, &assignment.column, assignment.value.clone())?;
            }
        }
    }

    Ok(Set { assignments })
}
