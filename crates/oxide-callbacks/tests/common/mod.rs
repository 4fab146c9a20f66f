#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, TimeZone, Utc};
use oxide_callbacks::{
    Config, ConnPool, Database, Error, ExecResult, Field, Logger, Model, Result, Rows, Schema,
};
use oxide_clause::{GenericDialect, SqlValue};

// ==================== Pool ====================

#[derive(Debug, Default)]
struct PoolState {
    executed: Vec<(String, Vec<SqlValue>)>,
    rows: VecDeque<Rows>,
    rows_affected: u64,
    last_insert_id: Option<i64>,
    failure: Option<String>,
}

/// Records every statement and answers with queued results.
#[derive(Debug, Clone)]
pub struct MockPool {
    state: Arc<Mutex<PoolState>>,
}

impl MockPool {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PoolState {
                rows_affected: 1,
                ..PoolState::default()
            })),
        }
    }

    pub fn push_rows(&self, rows: Rows) {
        self.state.lock().unwrap().rows.push_back(rows);
    }

    pub fn set_rows_affected(&self, rows: u64) {
        self.state.lock().unwrap().rows_affected = rows;
    }

    pub fn set_last_insert_id(&self, id: i64) {
        self.state.lock().unwrap().last_insert_id = Some(id);
    }

    pub fn fail_with(&self, msg: &str) {
        self.state.lock().unwrap().failure = Some(msg.to_string());
    }

    pub fn executed(&self) -> Vec<(String, Vec<SqlValue>)> {
        self.state.lock().unwrap().executed.clone()
    }

    pub fn sqls(&self) -> Vec<String> {
        self.executed().into_iter().map(|(sql, _)| sql).collect()
    }

    fn record(&self, sql: &str, vars: &[SqlValue]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.executed.push((sql.to_string(), vars.to_vec()));
        match &state.failure {
            Some(msg) => Err(Error::database(msg.clone())),
            None => Ok(()),
        }
    }
}

impl ConnPool for MockPool {
    fn exec(&self, sql: &str, vars: &[SqlValue]) -> Result<ExecResult> {
        self.record(sql, vars)?;
        let state = self.state.lock().unwrap();
        Ok(ExecResult {
            rows_affected: state.rows_affected,
            last_insert_id: state.last_insert_id,
        })
    }

    fn query(&self, sql: &str, vars: &[SqlValue]) -> Result<Rows> {
        self.record(sql, vars)?;
        Ok(self.state.lock().unwrap().rows.pop_front().unwrap_or_default())
    }
}

// ==================== Logger ====================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Info(String),
    Warn(String),
    Error(String),
    Trace { sql: String, rows: u64, failed: bool },
}

/// Keeps every log entry for inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    entries: Arc<Mutex<Vec<Entry>>>,
}

impl RecordingLogger {
    pub fn entries(&self) -> Vec<Entry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Warn(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    pub fn traces(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Trace { sql, .. } => Some(sql),
                _ => None,
            })
            .collect()
    }

    fn push(&self, entry: Entry) {
        self.entries.lock().unwrap().push(entry);
    }
}

impl Logger for RecordingLogger {
    fn info(&self, msg: &str) {
        self.push(Entry::Info(msg.to_string()));
    }

    fn warn(&self, msg: &str) {
        self.push(Entry::Warn(msg.to_string()));
    }

    fn error(&self, msg: &str) {
        self.push(Entry::Error(msg.to_string()));
    }

    fn trace(&self, _begin: Instant, sql: &dyn Fn() -> (String, u64), err: Option<&Error>) {
        let (sql, rows) = sql();
        self.push(Entry::Trace {
            sql,
            rows,
            failed: err.is_some(),
        });
    }
}

// ==================== Model ====================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn named(name: &str, age: i64) -> Self {
        Self {
            name: name.to_string(),
            age,
            ..Self::default()
        }
    }
}

fn timestamp(value: Option<DateTime<Utc>>) -> SqlValue {
    value.map_or(SqlValue::Null, SqlValue::Timestamp)
}

impl Model for User {
    fn schema() -> Schema {
        Schema::new("users")
            .field(Field::new("id").primary_key().auto_increment())
            .field(Field::new("name"))
            .field(Field::new("age"))
            .field(Field::new("created_at").auto_create_time())
            .field(Field::new("updated_at").auto_update_time())
    }

    fn value(&self, column: &str) -> Option<SqlValue> {
        match column {
            "id" => Some(SqlValue::Int(self.id)),
            "name" => Some(SqlValue::Text(self.name.clone())),
            "age" => Some(SqlValue::Int(self.age)),
            "created_at" => Some(timestamp(self.created_at)),
            "updated_at" => Some(timestamp(self.updated_at)),
            _ => None,
        }
    }

    fn set_value(&mut self, column: &str, value: SqlValue) -> Result<()> {
        match (column, value) {
            ("id", SqlValue::Int(id)) => self.id = id,
            ("name", SqlValue::Text(name)) => self.name = name,
            ("age", SqlValue::Int(age)) => self.age = age,
            ("created_at", SqlValue::Timestamp(ts)) => self.created_at = Some(ts),
            ("updated_at", SqlValue::Timestamp(ts)) => self.updated_at = Some(ts),
            ("created_at" | "updated_at", SqlValue::Null) => {}
            (column, value) => {
                return Err(Error::InvalidData(format!("{column} = {value:?}")));
            }
        }
        Ok(())
    }

    fn before_save(&mut self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Validation("name is required".to_string()));
        }
        Ok(())
    }
}

pub fn user_rows(users: &[(i64, &str, i64)]) -> Rows {
    Rows::new(
        vec!["id".into(), "name".into(), "age".into()],
        users
            .iter()
            .map(|&(id, name, age)| vec![SqlValue::Int(id), SqlValue::from(name), SqlValue::Int(age)])
            .collect(),
    )
}

// ==================== Setup ====================

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
}

pub fn open_db(pool: &MockPool) -> Database {
    open_db_with(pool, Config::default())
}

pub fn open_db_with(pool: &MockPool, config: Config) -> Database {
    Database::open(GenericDialect::new(), pool.clone(), config)
        .unwrap()
        .with_now_fn(fixed_now)
}

pub fn open_db_logged(pool: &MockPool, config: Config) -> (Database, RecordingLogger) {
    let logger = RecordingLogger::default();
    let db = Database::open_with_logger(GenericDialect::new(), pool.clone(), config, logger.clone())
        .unwrap()
        .with_now_fn(fixed_now);
    (db, logger)
}
