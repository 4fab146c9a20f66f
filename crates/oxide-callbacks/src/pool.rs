//! The connection collaborator statements are executed against.

use oxide_clause::SqlValue;

use crate::error::Result;

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Id generated for an auto-increment column, if the driver reports one.
    pub last_insert_id: Option<i64>,
}

/// A result set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rows {
    pub columns: Vec<String>,
    pub values: Vec<Vec<SqlValue>>,
}

impl Rows {
    pub fn new(columns: Vec<String>, values: Vec<Vec<SqlValue>>) -> Self {
        Self { columns, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over rows as `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = Vec<(&str, &SqlValue)>> {
        self.values.iter().map(|row| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect()
        })
    }

    /// Returns the value of `column` in row `row`.
    pub fn get(&self, row: usize, column: &str) -> Option<&SqlValue> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.values.get(row)?.get(idx)
    }
}

/// Executes SQL. Pooling, connections and transactions are the
/// implementation's business.
pub trait ConnPool: Send + Sync {
    /// Runs a statement that returns no rows.
    fn exec(&self, sql: &str, vars: &[SqlValue]) -> Result<ExecResult>;

    /// Runs a statement that returns rows.
    fn query(&self, sql: &str, vars: &[SqlValue]) -> Result<Rows>;
}
