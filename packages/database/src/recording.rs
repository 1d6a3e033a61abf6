//! A [`Database`] that records statements instead of running them.
//!
//! [`RecordingDatabase`] keeps every statement text and its bound parameters in call
//! order, answers queries from a queue of scripted row sets, and lets tests choose the
//! dialect, catalog name and liveness it reports. It is the substitutable fake for code
//! that needs to assert exactly what SQL would be sent.
//!
//! Clones share the recorded statements, the queued results and the liveness flag, so a
//! test can hand one clone to the code under test and inspect the other.
//!
//! ```
//! use switchy_database::{Database, DatabaseValue, recording::RecordingDatabase};
//!
//! let db = RecordingDatabase::new();
//! db.exec_raw_params("DELETE FROM person WHERE id = ?", &[DatabaseValue::Int64(3)])?;
//!
//! let statements = db.statements();
//! assert_eq!(statements[0].sql, "DELETE FROM person WHERE id = ?");
//! assert_eq!(statements[0].params, vec![DatabaseValue::Int64(3)]);
//! # Ok::<(), switchy_database::DatabaseError>(())
//! ```

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{Database, DatabaseError, DatabaseValue, Dialect, Row};

/// One statement received by a [`RecordingDatabase`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub sql: String,
    pub params: Vec<DatabaseValue>,
}

#[derive(Debug, Clone)]
pub struct RecordingDatabase {
    statements: Arc<Mutex<Vec<RecordedStatement>>>,
    results: Arc<Mutex<VecDeque<Result<Vec<Row>, String>>>>,
    catalog: String,
    dialect: Dialect,
    affected_rows: u64,
    connected: Arc<AtomicBool>,
}

impl Default for RecordingDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self {
            statements: Arc::new(Mutex::new(vec![])),
            results: Arc::new(Mutex::new(VecDeque::new())),
            catalog: "test".to_string(),
            dialect: Dialect::MySql,
            affected_rows: 1,
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = catalog.into();
        self
    }

    #[must_use]
    pub const fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Row count returned from every `exec_raw_params` call.
    #[must_use]
    pub const fn with_affected_rows(mut self, affected_rows: u64) -> Self {
        self.affected_rows = affected_rows;
        self
    }

    /// Queues the rows returned by the next unanswered query.
    ///
    /// Queries with nothing queued return no rows.
    #[must_use]
    pub fn with_rows(self, rows: Vec<Row>) -> Self {
        self.push_rows(rows);
        self
    }

    pub fn push_rows(&self, rows: Vec<Row>) {
        lock(&self.results).push_back(Ok(rows));
    }

    /// Makes the next unanswered query fail with [`DatabaseError::QueryFailed`].
    pub fn push_failure(&self, message: impl Into<String>) {
        lock(&self.results).push_back(Err(message.into()));
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    #[must_use]
    pub fn statements(&self) -> Vec<RecordedStatement> {
        lock(&self.statements).clone()
    }

    #[must_use]
    pub fn last_statement(&self) -> Option<RecordedStatement> {
        lock(&self.statements).last().cloned()
    }

    pub fn clear(&self) {
        lock(&self.statements).clear();
    }

    fn record(&self, sql: &str, params: &[DatabaseValue]) -> Result<(), DatabaseError> {
        if !self.is_connected() {
            return Err(DatabaseError::Closed);
        }

        log::trace!("record: '{sql}' params: {params:?}");

        lock(&self.statements).push(RecordedStatement {
            sql: sql.to_string(),
            params: params.to_vec(),
        });

        Ok(())
    }
}

// A panicking test thread should not hide what was recorded before it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl Database for RecordingDatabase {
    fn query_raw_params(
        &self,
        query: &str,
        params: &[DatabaseValue],
    ) -> Result<Vec<Row>, DatabaseError> {
        self.record(query, params)?;

        match lock(&self.results).pop_front() {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(message)) => Err(DatabaseError::QueryFailed(message)),
            None => Ok(vec![]),
        }
    }

    fn exec_raw_params(
        &self,
        statement: &str,
        params: &[DatabaseValue],
    ) -> Result<u64, DatabaseError> {
        self.record(statement, params)?;

        Ok(self.affected_rows)
    }

    fn exec_raw(&self, statement: &str) -> Result<(), DatabaseError> {
        self.record(statement, &[])
    }

    fn current_catalog(&self) -> Result<String, DatabaseError> {
        if !self.is_connected() {
            return Err(DatabaseError::Closed);
        }

        Ok(self.catalog.clone())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn close(&self) -> Result<(), DatabaseError> {
        self.set_connected(false);
        Ok(())
    }
}
