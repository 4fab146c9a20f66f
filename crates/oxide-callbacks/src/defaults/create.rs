//! `oxide:create`: INSERT with automatic timestamps and generated keys.

use oxide_clause::{Assignment, Clause, Insert, Returning, SqlValue, Values};

use crate::error::{Error, Result};
use crate::pool::Rows;
use crate::record::{Record, ReflectValue};
use crate::statement::Statement;

pub(super) fn create(stmt: &mut Statement<'_>) {
    if stmt.error().is_some() {
        return;
    }

    if stmt.sql.is_empty() {
        let Some(table) = stmt.table_name() else {
            stmt.add_error(Error::InvalidData(
                "create needs a model or a table".to_string(),
            ));
            return;
        };
        stmt.add_clause_if_absent(Insert::table(&table));
        match convert_to_create_values(stmt) {
            Ok(values) => {
                let upsert = expand_on_conflict(stmt, &values.columns);
                stmt.add_clause(values);
                if let Err(err) = upsert {
                    stmt.add_error(err);
                    return;
                }
            }
            Err(err) => {
                stmt.add_error(err);
                return;
            }
        }
        if let Some(returning) = returning_columns(stmt) {
            stmt.add_clause_if_absent(returning);
        }
        stmt.build_default();
    }

    if stmt.dry_run || stmt.error().is_some() {
        return;
    }

    let pool = stmt.db().pool();
    let returning = stmt.clause("RETURNING").is_some()
        && stmt.build_clauses.iter().any(|name| name == "RETURNING");
    if returning {
        match pool.query(&stmt.sql, &stmt.vars) {
            Ok(rows) => {
                stmt.rows_affected = rows.len() as u64;
                if let Err(err) = write_returned(stmt, &rows) {
                    stmt.add_error(err);
                }
            }
            Err(err) => stmt.add_error(err),
        }
    } else {
        match pool.exec(&stmt.sql, &stmt.vars) {
            Ok(result) => {
                stmt.rows_affected = result.rows_affected;
                if let Some(id) = result.last_insert_id {
                    if let Err(err) = write_insert_id(stmt, id) {
                        stmt.add_error(err);
                    }
                }
            }
            Err(err) => stmt.add_error(err),
        }
    }
}

/// Collects the rows to insert, stamping zero auto-time columns on the
/// destination as it goes.
///
/// Columns the database can fill are left out unless every row sets them.
fn convert_to_create_values(stmt: &mut Statement<'_>) -> Result<Values> {
    let now = stmt.db().now();
    let reflect = stmt.reflect_value;
    let schema = stmt.schema.clone();
    let dest = stmt.dest_mut().ok_or(Error::InvalidValue)?;

    let Some(schema) = schema else {
        let columns: Vec<String> = dest
            .columns()
            .into_iter()
            .filter(|column| !column.starts_with('@'))
            .collect();
        let row = columns
            .iter()
            .map(|column| dest.field_value(0, column).unwrap_or(SqlValue::Null))
            .collect();
        return Ok(Values {
            columns,
            values: vec![row],
        });
    };

    let rows = match reflect {
        ReflectValue::Struct | ReflectValue::Map => 1,
        ReflectValue::Slice(0) => return Err(Error::EmptySlice),
        ReflectValue::Slice(len) => len,
        ReflectValue::Invalid => return Err(Error::InvalidValue),
    };

    let columns: Vec<String> = schema
        .fields
        .iter()
        .filter(|field| {
            !field.has_default()
                || (0..rows).all(|row| {
                    dest.field_value(row, &field.name)
                        .is_some_and(|value| !value.is_zero())
                })
        })
        .map(|field| field.name.clone())
        .collect();

    let mut values = Vec::with_capacity(rows);
    for row in 0..rows {
        let mut data = Vec::with_capacity(columns.len());
        for column in &columns {
            let mut value = dest.field_value(row, column).unwrap_or(SqlValue::Null);
            let stamped = schema
                .lookup(column)
                .is_some_and(|field| field.auto_create_time || field.auto_update_time);
            if stamped && value.is_zero() {
                value = SqlValue::Timestamp(now);
                dest.set_field_value(row, column, value.clone())?;
            }
            data.push(value);
        }
        values.push(data);
    }

    Ok(Values { columns, values })
}

/// Fills an `update_all` conflict clause from the inserted columns.
///
/// Keys, database-defaulted and creation-time columns keep their stored
/// value; update-time columns are set to now. The conflict target defaults to
/// the primary key.
fn expand_on_conflict(stmt: &mut Statement<'_>, columns: &[String]) -> Result<()> {
    let Some(Clause::OnConflict(on_conflict)) = stmt.clause("ON CONFLICT") else {
        return Ok(());
    };
    let dialect = stmt.db().dialect();
    if !dialect.supports_upsert() {
        return Err(Error::InvalidData(format!(
            "{} dialect does not support ON CONFLICT",
            dialect.name()
        )));
    }
    if !on_conflict.update_all || columns.is_empty() {
        return Ok(());
    }
    let Some(schema) = stmt.schema.as_ref() else {
        return Ok(());
    };

    let mut on_conflict = on_conflict.clone();
    let now = stmt.db().now();
    for column in columns {
        let Some(field) = schema.lookup(column) else {
            continue;
        };
        if field.primary_key || field.has_default() || field.auto_create_time {
            continue;
        }
        if field.auto_update_time {
            on_conflict.do_updates.push(Assignment {
                column: column.clone(),
                value: SqlValue::Timestamp(now),
            });
        } else {
            on_conflict.update_columns.push(column.clone());
        }
    }
    if on_conflict.do_updates.is_empty() && on_conflict.update_columns.is_empty() {
        on_conflict.do_nothing = true;
    }
    if on_conflict.columns.is_empty() {
        on_conflict.columns = schema
            .fields
            .iter()
            .filter(|field| field.primary_key)
            .map(|field| field.name.clone())
            .collect();
    }
    on_conflict.update_all = false;
    stmt.add_clause(on_conflict);
    Ok(())
}

/// `RETURNING` for the database-filled columns, when the dialect and the
/// stage's clause list allow it.
fn returning_columns(stmt: &Statement<'_>) -> Option<Returning> {
    if !stmt.db().dialect().supports_returning()
        || !stmt.build_clauses.iter().any(|name| name == "RETURNING")
    {
        return None;
    }
    let columns: Vec<String> = stmt
        .schema
        .as_ref()?
        .fields
        .iter()
        .filter(|field| field.has_default())
        .map(|field| field.name.clone())
        .collect();
    (!columns.is_empty()).then_some(Returning { columns })
}

/// Copies returned columns onto the destination rows in order.
///
/// Under `DO NOTHING` ignored rows return nothing, so each returned row goes
/// to the next destination row whose primary key is still unset.
fn write_returned(stmt: &mut Statement<'_>, rows: &Rows) -> Result<()> {
    let skip_keyed = matches!(
        stmt.clause("ON CONFLICT"),
        Some(Clause::OnConflict(on_conflict)) if on_conflict.do_nothing
    );
    let primary = stmt
        .schema
        .as_ref()
        .and_then(|schema| schema.primary_field())
        .map(|field| field.name.clone());
    let Some(dest) = stmt.dest_mut() else {
        return Ok(());
    };

    let len = dest.len();
    let mut row = 0;
    for values in &rows.values {
        if let (true, Some(column)) = (skip_keyed, &primary) {
            while row < len && !unset(dest, row, column) {
                row += 1;
            }
        }
        if row >= len {
            break;
        }
        for (column, value) in rows.columns.iter().zip(values) {
            dest.set_field_value(row, column, value.clone())?;
        }
        row += 1;
    }
    Ok(())
}

/// Assigns generated ids to rows whose primary key is still zero.
///
/// Batch ids are consecutive. The driver reports the first one, or the last
/// one when `last_insert_id_reversed` is set.
fn write_insert_id(stmt: &mut Statement<'_>, id: i64) -> Result<()> {
    if stmt.rows_affected == 0 || id <= 0 {
        return Ok(());
    }
    let reversed = stmt.db().config().last_insert_id_reversed;
    let reflect = stmt.reflect_value;
    let primary = stmt
        .schema
        .as_ref()
        .and_then(|schema| schema.primary_field())
        .filter(|field| field.has_default())
        .map(|field| field.name.clone());
    let Some(dest) = stmt.dest_mut() else {
        return Ok(());
    };

    match (reflect, primary) {
        (ReflectValue::Map, _) => dest.set_field_value(0, "@id", SqlValue::Int(id)),
        (ReflectValue::Struct, Some(column)) => {
            if unset(dest, 0, &column) {
                dest.set_field_value(0, &column, SqlValue::Int(id))?;
            }
            Ok(())
        }
        (ReflectValue::Slice(len), Some(column)) => {
            let mut next = id;
            if reversed {
                for row in (0..len).rev() {
                    if unset(dest, row, &column) {
                        dest.set_field_value(row, &column, SqlValue::Int(next))?;
                        next -= 1;
                    }
                }
            } else {
                for row in 0..len {
                    if unset(dest, row, &column) {
                        dest.set_field_value(row, &column, SqlValue::Int(next))?;
                        next += 1;
                    }
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn unset(dest: &dyn Record, row: usize, column: &str) -> bool {
    dest.field_value(row, column)
        .is_none_or(|value| value.is_zero())
}
