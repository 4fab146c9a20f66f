//! Built-in steps registered on every stage when a database opens.
//!
//! | stage  | steps |
//! | ------ | ----- |
//! | create | `oxide:before_create`, `oxide:create`, `oxide:after_create` |
//! | query  | `oxide:query`, `oxide:after_query` |
//! | update | `oxide:before_update`, `oxide:update`, `oxide:after_update` |
//! | delete | `oxide:before_delete`, `oxide:delete`, `oxide:after_delete` |
//! | row    | `oxide:row` |
//! | raw    | `oxide:raw` |
//!
//! Every step returns early when the statement already carries an error, and
//! executing steps stop after building SQL in dry-run mode.

mod create;
mod delete;
mod query;
mod raw;
mod update;

use oxide_clause::{Expression, SqlValue, Where};

use crate::callbacks::Callbacks;
use crate::error::Result;
use crate::record::{Hook, ReflectValue};
use crate::statement::Statement;

pub(crate) fn register_default_callbacks(callbacks: &mut Callbacks) -> Result<()> {
    let stage = callbacks.create_mut();
    stage.register("oxide:before_create", before_create)?;
    stage.register("oxide:create", create::create)?;
    stage.register("oxide:after_create", after_create)?;

    let stage = callbacks.query_mut();
    stage.register("oxide:query", query::query)?;
    stage.register("oxide:after_query", after_query)?;

    let stage = callbacks.update_mut();
    stage.register("oxide:before_update", before_update)?;
    stage.register("oxide:update", update::update)?;
    stage.register("oxide:after_update", after_update)?;

    let stage = callbacks.delete_mut();
    stage.register("oxide:before_delete", before_delete)?;
    stage.register("oxide:delete", delete::delete)?;
    stage.register("oxide:after_delete", after_delete)?;

    callbacks.row_mut().register("oxide:row", raw::row)?;
    callbacks.raw_mut().register("oxide:raw", raw::raw)?;
    Ok(())
}

/// Calls `hooks` in order on the destination, recording every failure.
fn call_hooks(stmt: &mut Statement<'_>, hooks: &[Hook]) {
    if stmt.error().is_some() || stmt.skip_hooks || stmt.schema.is_none() {
        return;
    }
    let mut errors = Vec::new();
    if let Some(dest) = stmt.dest_mut() {
        for &hook in hooks {
            if let Err(err) = dest.call_hook(hook) {
                errors.push(err);
            }
        }
    }
    for err in errors {
        stmt.add_error(err);
    }
}

fn before_create(stmt: &mut Statement<'_>) {
    call_hooks(stmt, &[Hook::BeforeSave, Hook::BeforeCreate]);
}

fn after_create(stmt: &mut Statement<'_>) {
    call_hooks(stmt, &[Hook::AfterCreate, Hook::AfterSave]);
}

fn after_query(stmt: &mut Statement<'_>) {
    if stmt.rows_affected > 0 {
        call_hooks(stmt, &[Hook::AfterFind]);
    }
}

fn before_update(stmt: &mut Statement<'_>) {
    call_hooks(stmt, &[Hook::BeforeSave, Hook::BeforeUpdate]);
}

fn after_update(stmt: &mut Statement<'_>) {
    call_hooks(stmt, &[Hook::AfterUpdate, Hook::AfterSave]);
}

fn before_delete(stmt: &mut Statement<'_>) {
    call_hooks(stmt, &[Hook::BeforeDelete]);
}

fn after_delete(stmt: &mut Statement<'_>) {
    call_hooks(stmt, &[Hook::AfterDelete]);
}

/// Restricts the statement to the destination's primary keys, when it has
/// any that are set.
fn add_primary_key_condition(stmt: &mut Statement<'_>) {
    let Some(column) = stmt
        .schema
        .as_ref()
        .and_then(|schema| schema.primary_field())
        .map(|field| field.name.clone())
    else {
        return;
    };
    let rows = match stmt.reflect_value {
        ReflectValue::Struct => 1,
        ReflectValue::Slice(len) => len,
        ReflectValue::Map | ReflectValue::Invalid => return,
    };
    let keys: Vec<SqlValue> = match stmt.dest() {
        Some(dest) => (0..rows)
            .filter_map(|row| dest.field_value(row, &column))
            .filter(|value| !value.is_zero())
            .collect(),
        None => return,
    };

    match keys.len() {
        0 => {}
        1 if stmt.reflect_value == ReflectValue::Struct => {
            let key = keys.into_iter().next().unwrap_or(SqlValue::Null);
            stmt.add_clause(Where::new(vec![Expression::eq(&column, key)]));
        }
        _ => stmt.add_clause(Where::new(vec![Expression::in_list(&column, keys)])),
    }
}

/// Whether the statement carries at least one WHERE condition.
fn has_conditions(stmt: &Statement<'_>) -> bool {
    stmt.clause("WHERE").is_some_and(|clause| !clause.is_empty())
}
