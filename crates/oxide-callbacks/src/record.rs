//! Mapping between Rust values and table rows.
//!
//! [`Model`] is what users implement for their structs. The pipeline itself
//! only sees [`Record`], which is object safe and implemented for models,
//! lists of models, optional models and string-keyed maps.

use std::collections::BTreeMap;

use oxide_clause::SqlValue;

use crate::error::{Error, Result};
use crate::pool::Rows;
use crate::statement::Statement;

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Field {
    pub name: String,
    pub primary_key: bool,
    pub auto_increment: bool,
    /// The database fills the column when the insert leaves it out.
    pub has_default_db_value: bool,
    pub auto_create_time: bool,
    pub auto_update_time: bool,
}

impl Field {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    #[must_use]
    pub const fn db_default(mut self) -> Self {
        self.has_default_db_value = true;
        self
    }

    /// Stamped with the current time on insert when zero.
    #[must_use]
    pub const fn auto_create_time(mut self) -> Self {
        self.auto_create_time = true;
        self
    }

    /// Stamped with the current time on insert when zero and on every update.
    #[must_use]
    pub const fn auto_update_time(mut self) -> Self {
        self.auto_update_time = true;
        self
    }

    /// Whether an insert may leave this column out.
    pub const fn has_default(&self) -> bool {
        self.has_default_db_value || self.auto_increment
    }
}

/// Table metadata for a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub table: String,
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The first primary key column.
    pub fn primary_field(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.primary_key)
    }
}

/// Model lifecycle hooks, in the order the built-in steps call them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    BeforeSave,
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    AfterUpdate,
    AfterSave,
    BeforeDelete,
    AfterDelete,
    AfterFind,
}

/// What a destination resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReflectValue {
    /// Not resolved, or unusable.
    #[default]
    Invalid,
    /// A single record.
    Struct,
    /// A list of `n` records.
    Slice(usize),
    /// A single schema-less map.
    Map,
}

/// Optional capability: adjust the statement before it runs.
pub trait StatementModifier {
    fn modify_statement(&mut self, stmt: &mut Statement<'_>);
}

/// A user struct mapped to a table.
///
/// ```rust
/// use oxide_callbacks::{Field, Model, Result, Schema};
/// use oxide_clause::SqlValue;
///
/// #[derive(Default)]
/// struct Tag {
///     id: i64,
///     label: String,
/// }
///
/// impl Model for Tag {
///     fn schema() -> Schema {
///         Schema::new("tags")
///             .field(Field::new("id").primary_key().auto_increment())
///             .field(Field::new("label"))
///     }
///
///     fn value(&self, column: &str) -> Option<SqlValue> {
///         match column {
///             "id" => Some(SqlValue::Int(self.id)),
///             "label" => Some(SqlValue::Text(self.label.clone())),
///             _ => None,
///         }
///     }
///
///     fn set_value(&mut self, column: &str, value: SqlValue) -> Result<()> {
///         match (column, value) {
///             ("id", SqlValue::Int(id)) => self.id = id,
///             ("label", SqlValue::Text(label)) => self.label = label,
///             (column, value) => {
///                 return Err(oxide_callbacks::Error::InvalidData(format!(
///                     "cannot assign {value:?} to {column}"
///                 )))
///             }
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Model {
    fn schema() -> Schema
    where
        Self: Sized;

    fn value(&self, column: &str) -> Option<SqlValue>;

    fn set_value(&mut self, column: &str, value: SqlValue) -> Result<()>;

    fn before_save(&mut self) -> Result<()> {
        Ok(())
    }

    fn before_create(&mut self) -> Result<()> {
        Ok(())
    }

    fn after_create(&mut self) -> Result<()> {
        Ok(())
    }

    fn after_save(&mut self) -> Result<()> {
        Ok(())
    }

    fn before_update(&mut self) -> Result<()> {
        Ok(())
    }

    fn after_update(&mut self) -> Result<()> {
        Ok(())
    }

    fn before_delete(&mut self) -> Result<()> {
        Ok(())
    }

    fn after_delete(&mut self) -> Result<()> {
        Ok(())
    }

    fn after_find(&mut self) -> Result<()> {
        Ok(())
    }

    /// Returns `Some(self)` for models implementing [`StatementModifier`].
    fn as_statement_modifier(&mut self) -> Option<&mut dyn StatementModifier> {
        None
    }
}

fn call_model_hook<M: Model>(model: &mut M, hook: Hook) -> Result<()> {
    match hook {
        Hook::BeforeSave => model.before_save(),
        Hook::BeforeCreate => model.before_create(),
        Hook::AfterCreate => model.after_create(),
        Hook::AfterSave => model.after_save(),
        Hook::BeforeUpdate => model.before_update(),
        Hook::AfterUpdate => model.after_update(),
        Hook::BeforeDelete => model.before_delete(),
        Hook::AfterDelete => model.after_delete(),
        Hook::AfterFind => model.after_find(),
    }
}

/// Copies the columns of `row` that `schema` knows into `model`.
fn scan_row<M: Model>(model: &mut M, schema: &Schema, rows: &Rows, row: usize) -> Result<()> {
    for (idx, column) in rows.columns.iter().enumerate() {
        if schema.lookup(column).is_none() {
            continue;
        }
        if let Some(value) = rows.values.get(row).and_then(|r| r.get(idx)) {
            model.set_value(column, value.clone())?;
        }
    }
    Ok(())
}

/// The view of a model, destination or result the pipeline works with.
///
/// Rows are addressed by index: `0` for single records, `0..len` for lists.
pub trait Record {
    /// The table metadata, or [`Error::UnsupportedDataType`] for values that
    /// do not describe a table.
    fn parse_schema(&self) -> Result<Schema>;

    /// Resolves indirections, allocating through empty ones.
    fn resolve(&mut self) -> ReflectValue;

    /// Number of rows this value holds.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn field_value(&self, row: usize, column: &str) -> Option<SqlValue>;

    fn set_field_value(&mut self, row: usize, column: &str, value: SqlValue) -> Result<()>;

    /// Columns to insert for schema-less values.
    fn columns(&self) -> Vec<String> {
        self.parse_schema()
            .map(|s| s.fields.into_iter().map(|f| f.name).collect())
            .unwrap_or_default()
    }

    /// Loads query results into this value.
    fn scan(&mut self, rows: &Rows) -> Result<()>;

    /// Calls `hook` on every row.
    fn call_hook(&mut self, _hook: Hook) -> Result<()> {
        Ok(())
    }

    fn statement_modifier(&mut self) -> Option<&mut dyn StatementModifier> {
        None
    }
}

impl<M: Model> Record for M {
    fn parse_schema(&self) -> Result<Schema> {
        Ok(M::schema())
    }

    fn resolve(&mut self) -> ReflectValue {
        ReflectValue::Struct
    }

    fn len(&self) -> usize {
        1
    }

    fn field_value(&self, row: usize, column: &str) -> Option<SqlValue> {
        (row == 0).then(|| Model::value(self, column)).flatten()
    }

    fn set_field_value(&mut self, row: usize, column: &str, value: SqlValue) -> Result<()> {
        if row != 0 {
            return Err(Error::InvalidData(format!("row {row} out of range")));
        }
        Model::set_value(self, column, value)
    }

    fn scan(&mut self, rows: &Rows) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        scan_row(self, &M::schema(), rows, 0)
    }

    fn call_hook(&mut self, hook: Hook) -> Result<()> {
        call_model_hook(self, hook)
    }

    fn statement_modifier(&mut self) -> Option<&mut dyn StatementModifier> {
        Model::as_statement_modifier(self)
    }
}

impl<M: Model + Default> Record for Vec<M> {
    fn parse_schema(&self) -> Result<Schema> {
        Ok(M::schema())
    }

    fn resolve(&mut self) -> ReflectValue {
        ReflectValue::Slice(Vec::len(self))
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn field_value(&self, row: usize, column: &str) -> Option<SqlValue> {
        Model::value(self.get(row)?, column)
    }

    fn set_field_value(&mut self, row: usize, column: &str, value: SqlValue) -> Result<()> {
        match self.get_mut(row) {
            Some(model) => Model::set_value(model, column, value),
            None => Err(Error::InvalidData(format!("row {row} out of range"))),
        }
    }

    fn scan(&mut self, rows: &Rows) -> Result<()> {
        let schema = M::schema();
        self.clear();
        for row in 0..rows.len() {
            let mut model = M::default();
            scan_row(&mut model, &schema, rows, row)?;
            self.push(model);
        }
        Ok(())
    }

    fn call_hook(&mut self, hook: Hook) -> Result<()> {
        self.iter_mut().try_for_each(|model| call_model_hook(model, hook))
    }
}

impl<M: Model + Default> Record for Option<M> {
    fn parse_schema(&self) -> Result<Schema> {
        Ok(M::schema())
    }

    fn resolve(&mut self) -> ReflectValue {
        self.get_or_insert_with(M::default);
        ReflectValue::Struct
    }

    fn len(&self) -> usize {
        usize::from(self.is_some())
    }

    fn field_value(&self, row: usize, column: &str) -> Option<SqlValue> {
        self.as_ref()?.field_value(row, column)
    }

    fn set_field_value(&mut self, row: usize, column: &str, value: SqlValue) -> Result<()> {
        self.get_or_insert_with(M::default)
            .set_field_value(row, column, value)
    }

    fn scan(&mut self, rows: &Rows) -> Result<()> {
        if rows.is_empty() {
            *self = None;
            return Ok(());
        }
        self.get_or_insert_with(M::default).scan(rows)
    }

    fn call_hook(&mut self, hook: Hook) -> Result<()> {
        self.as_mut().map_or(Ok(()), |model| call_model_hook(model, hook))
    }

    fn statement_modifier(&mut self) -> Option<&mut dyn StatementModifier> {
        self.as_mut().and_then(Model::as_statement_modifier)
    }
}

impl Record for BTreeMap<String, SqlValue> {
    fn parse_schema(&self) -> Result<Schema> {
        Err(Error::UnsupportedDataType("map".to_string()))
    }

    fn resolve(&mut self) -> ReflectValue {
        ReflectValue::Map
    }

    fn len(&self) -> usize {
        1
    }

    fn field_value(&self, row: usize, column: &str) -> Option<SqlValue> {
        (row == 0).then(|| self.get(column).cloned()).flatten()
    }

    fn set_field_value(&mut self, row: usize, column: &str, value: SqlValue) -> Result<()> {
        if row != 0 {
            return Err(Error::InvalidData(format!("row {row} out of range")));
        }
        self.insert(column.to_string(), value);
        Ok(())
    }

    fn columns(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }

    fn scan(&mut self, rows: &Rows) -> Result<()> {
        if let Some(first) = rows.iter().next() {
            for (column, value) in first {
                self.insert(column.to_string(), value.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Note {
        id: i64,
        body: String,
    }

    impl Model for Note {
        fn schema() -> Schema {
            Schema::new("notes")
                .field(Field::new("id").primary_key().auto_increment())
                .field(Field::new("body"))
        }

        fn value(&self, column: &str) -> Option<SqlValue> {
            match column {
                "id" => Some(SqlValue::Int(self.id)),
                "body" => Some(SqlValue::Text(self.body.clone())),
                _ => None,
            }
        }

        fn set_value(&mut self, column: &str, value: SqlValue) -> Result<()> {
            match (column, value) {
                ("id", SqlValue::Int(id)) => self.id = id,
                ("body", SqlValue::Text(body)) => self.body = body,
                (column, _) => return Err(Error::InvalidData(column.to_string())),
            }
            Ok(())
        }

        fn before_save(&mut self) -> Result<()> {
            if self.body.is_empty() {
                return Err(Error::Validation("body is required".into()));
            }
            Ok(())
        }
    }

    fn rows() -> Rows {
        Rows::new(
            vec!["id".into(), "body".into(), "extra".into()],
            vec![
                vec![SqlValue::Int(1), SqlValue::from("first"), SqlValue::Null],
                vec![SqlValue::Int(2), SqlValue::from("second"), SqlValue::Null],
            ],
        )
    }

    #[test]
    fn test_schema_primary_field() {
        let schema = Note::schema();
        assert_eq!(schema.primary_field().map(|f| f.name.as_str()), Some("id"));
        assert!(schema.lookup("id").unwrap().has_default());
        assert!(!schema.lookup("body").unwrap().has_default());
    }

    #[test]
    fn test_struct_scan_ignores_unknown_columns() {
        let mut note = Note::default();
        note.scan(&rows()).unwrap();
        assert_eq!(note, Note { id: 1, body: "first".into() });
    }

    #[test]
    fn test_vec_scan_replaces_contents() {
        let mut notes = vec![Note::default()];
        notes.scan(&rows()).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].body, "second");
        assert_eq!(notes.resolve(), ReflectValue::Slice(2));
    }

    #[test]
    fn test_option_allocates_on_resolve() {
        let mut note: Option<Note> = None;
        assert_eq!(Record::len(&note), 0);
        assert_eq!(note.resolve(), ReflectValue::Struct);
        assert_eq!(note, Some(Note::default()));
    }

    #[test]
    fn test_option_scan_without_rows_is_none() {
        let mut note = Some(Note::default());
        note.scan(&Rows::default()).unwrap();
        assert!(note.is_none());
    }

    #[test]
    fn test_map_is_schemaless() {
        let mut map = BTreeMap::new();
        map.set_field_value(0, "name", SqlValue::from("x")).unwrap();
        assert!(matches!(
            map.parse_schema(),
            Err(Error::UnsupportedDataType(_))
        ));
        assert_eq!(Record::columns(&map), vec!["name".to_string()]);
        assert_eq!(map.resolve(), ReflectValue::Map);
    }

    #[test]
    fn test_hooks_run_per_row() {
        let mut notes = vec![
            Note {
                id: 1,
                body: "ok".into(),
            },
            Note::default(),
        ];
        let err = notes.call_hook(Hook::BeforeSave).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(notes.call_hook(Hook::AfterFind).is_ok());
    }
}
