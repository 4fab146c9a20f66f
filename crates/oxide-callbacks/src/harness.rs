//! Runs a stage's compiled pipeline against one statement.

use std::time::Instant;

use crate::error::Error;
use crate::stage::Stage;
use crate::statement::Statement;

impl Stage {
    /// Executes the compiled steps against `stmt` and returns it.
    ///
    /// Steps never stop the pipeline: each records failures on the
    /// statement and later steps check [`Statement::error`] themselves. A
    /// stale stage runs nothing and records [`Error::StalePipeline`].
    pub fn execute<'a>(&self, mut stmt: Statement<'a>) -> Statement<'a> {
        stmt.apply_scopes();

        let begin = Instant::now();
        let adopted_clauses = stmt.build_clauses.is_empty();
        if adopted_clauses {
            stmt.build_clauses = self.clauses.clone();
        }

        stmt.apply_statement_modifier();
        stmt.normalize_targets();
        stmt.parse_model();
        stmt.resolve_destination();

        match &self.compiled {
            Some(actions) => {
                for action in actions.iter() {
                    action(&mut stmt);
                }
            }
            None => stmt.add_error(Error::StalePipeline { stage: self.kind() }),
        }

        if !stmt.sql.is_empty() {
            trace(&stmt, begin);
        }

        if !stmt.dry_run {
            stmt.sql.clear();
            stmt.vars.clear();
        }

        if adopted_clauses {
            stmt.build_clauses.clear();
        }

        stmt
    }
}

fn trace(stmt: &Statement<'_>, begin: Instant) {
    let db = stmt.db();
    let logger = db.logger();
    logger.trace(
        begin,
        &|| {
            let sql = match logger.params_filter() {
                Some(filter) => {
                    let (sql, vars) = filter.filter_params(&stmt.sql, &stmt.vars);
                    db.dialect().explain(&sql, &vars)
                }
                None => db.dialect().explain(&stmt.sql, &stmt.vars),
            };
            (sql, stmt.rows_affected)
        },
        stmt.error(),
    );
}
