//! Error types for pipelines and the operations they run.

use thiserror::Error;

use crate::stage::StageKind;
use crate::step::Conflict;

/// Errors raised while compiling pipelines or running operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Two ordering constraints cannot both hold.
    #[error(transparent)]
    Conflict(#[from] Conflict),

    /// The stage's last compilation failed, so it has nothing to run.
    #[error("{stage} pipeline is stale: its last compilation failed")]
    StalePipeline {
        /// The stage that was asked to execute.
        stage: StageKind,
    },

    /// The destination resolved to no usable value.
    #[error("invalid value: destination must resolve to a record, a list of records or a map")]
    InvalidValue,

    /// A record held data that cannot be written.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The model does not describe a table.
    #[error("unsupported data type: {0}")]
    UnsupportedDataType(String),

    /// The model does not describe a table and none was given explicitly.
    #[error("unsupported data type: {0}: table not set, use `.model(..)` or `.table(..)`")]
    TableNotSet(String),

    /// Batch insert of an empty list.
    #[error("empty slice found")]
    EmptySlice,

    /// UPDATE or DELETE without conditions.
    #[error("WHERE conditions required")]
    MissingWhereClause,

    /// No row matched.
    #[error("record not found")]
    RecordNotFound,

    /// Error reported by the connection pool.
    #[error("database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Error returned by a model hook.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors accumulated over one operation, oldest first.
    #[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<Error>),
}

impl Error {
    /// Wraps a driver error.
    pub fn database(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Database(err.into())
    }

    /// Returns whether this error, or any error it accumulates, matches `pred`.
    pub fn any(&self, pred: impl Fn(&Self) -> bool + Copy) -> bool {
        match self {
            Self::Multiple(errors) => errors.iter().any(|e| e.any(pred)),
            other => pred(other),
        }
    }

    /// Folds `other` into this error, keeping both.
    #[must_use]
    pub fn join(self, other: Self) -> Self {
        match (self, other) {
            (Self::Multiple(mut errors), Self::Multiple(more)) => {
                errors.extend(more);
                Self::Multiple(errors)
            }
            (Self::Multiple(mut errors), other) => {
                errors.push(other);
                Self::Multiple(errors)
            }
            (first, other) => Self::Multiple(vec![first, other]),
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_flattens() {
        let err = Error::RecordNotFound
            .join(Error::InvalidValue)
            .join(Error::EmptySlice);
        match &err {
            Error::Multiple(errors) => assert_eq!(errors.len(), 3),
            other => panic!("expected Multiple, got {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "record not found; invalid value: destination must resolve to a record, a list of records or a map; empty slice found"
        );
    }

    #[test]
    fn test_any_looks_inside_multiple() {
        let err = Error::RecordNotFound.join(Error::MissingWhereClause);
        assert!(err.any(|e| matches!(e, Error::MissingWhereClause)));
        assert!(!err.any(|e| matches!(e, Error::EmptySlice)));
    }
}
