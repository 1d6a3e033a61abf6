use crate::{Database, DatabaseError, DatabaseValue, Dialect, Row, rusqlite::RusqliteDatabase};

/// Throwaway in-memory `SQLite` database.
///
/// Every instance gets its own private database, so tests and demos can create tables
/// freely without seeing each other's data.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug)]
pub struct SimulationDatabase {
    inner: RusqliteDatabase,
}

impl SimulationDatabase {
    /// # Errors
    ///
    /// * If the database connection fails to open in memory
    pub fn new() -> Result<Self, DatabaseError> {
        use std::sync::atomic::AtomicU64;

        static ID: AtomicU64 = AtomicU64::new(0);

        let id = ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let db_url = format!("file:simulation_memdb_{id}?mode=memory");

        let conn = ::rusqlite::Connection::open(&db_url)
            .map_err(|e| DatabaseError::Rusqlite(e.into()))?;
        conn.busy_timeout(std::time::Duration::from_millis(10))
            .map_err(|e| DatabaseError::Rusqlite(e.into()))?;

        log::debug!("Opened simulation database {db_url}");

        Ok(Self {
            inner: RusqliteDatabase::new(conn),
        })
    }
}

impl Database for SimulationDatabase {
    fn query_raw_params(
        &self,
        query: &str,
        params: &[DatabaseValue],
    ) -> Result<Vec<Row>, DatabaseError> {
        self.inner.query_raw_params(query, params)
    }

    fn exec_raw_params(
        &self,
        statement: &str,
        params: &[DatabaseValue],
    ) -> Result<u64, DatabaseError> {
        self.inner.exec_raw_params(statement, params)
    }

    fn exec_raw(&self, statement: &str) -> Result<(), DatabaseError> {
        self.inner.exec_raw(statement)
    }

    fn current_catalog(&self) -> Result<String, DatabaseError> {
        self.inner.current_catalog()
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    fn close(&self) -> Result<(), DatabaseError> {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn instances_are_isolated() {
        let first = SimulationDatabase::new().unwrap();
        let second = SimulationDatabase::new().unwrap();

        first
            .exec_raw("CREATE TABLE person (id INTEGER PRIMARY KEY, name TEXT)")
            .unwrap();

        assert!(second.query_raw_params("SELECT * FROM person", &[]).is_err());
        assert_eq!(
            first
                .query_raw_params("SELECT * FROM person", &[])
                .unwrap()
                .len(),
            0
        );
    }
}
