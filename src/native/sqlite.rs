//! Reference engine backed by `rusqlite`.
//!
//! Emulates the engine API on top of SQLite so the driver can run without the
//! proprietary client runtime. The DSN's `dbn` is the database path
//! (`:memory:` for an in-memory database); the remaining pairs are ignored.

use rusqlite::types::Value;
use tracing::debug;

use super::{
    BufferedCursor, FieldInfo, NativeConnection, NativeCursor, NativeDiagnostic, NativeDriver,
};
use crate::config::Dsn;
use crate::types::RowValues;

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl NativeDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn connect(
        &self,
        dsn: &Dsn,
        persistent: bool,
    ) -> Result<Box<dyn NativeConnection>, NativeDiagnostic> {
        let path = dsn
            .get("dbn")
            .ok_or_else(|| NativeDiagnostic::new(-1, "no dbn given in connection string"))?;
        if persistent {
            debug!(path, "sqlite has no persistent connections; opening a transient one");
        }
        let conn = if path == ":memory:" {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(path)
        }
        .map_err(diagnostic)?;
        Ok(Box::new(SqliteConnection::new(conn)))
    }
}

/// One SQLite connection with engine-style manual autocommit.
///
/// With autocommit off, the first statement after a commit or rollback opens
/// a transaction that stays open until the next commit or rollback.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: Option<rusqlite::Connection>,
    autocommit: bool,
    affected: u64,
    fields: usize,
    last_error: Option<NativeDiagnostic>,
}

impl SqliteConnection {
    #[must_use]
    pub fn new(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Some(conn),
            autocommit: true,
            affected: 0,
            fields: 0,
            last_error: None,
        }
    }

    fn conn(&self) -> Result<&rusqlite::Connection, NativeDiagnostic> {
        self.conn
            .as_ref()
            .ok_or_else(|| NativeDiagnostic::new(-1, "Not connected to a database"))
    }

    fn record<T>(&mut self, outcome: Result<T, NativeDiagnostic>) -> Result<T, NativeDiagnostic> {
        self.last_error = outcome.as_ref().err().cloned();
        outcome
    }

    fn in_transaction(&self) -> Result<bool, NativeDiagnostic> {
        Ok(!self.conn()?.is_autocommit())
    }

    fn end_transaction(&mut self, sql: &str) -> Result<(), NativeDiagnostic> {
        let outcome = match self.in_transaction() {
            Ok(true) => self.conn().and_then(|c| c.execute_batch(sql).map_err(diagnostic)),
            Ok(false) => Ok(()),
            Err(diag) => Err(diag),
        };
        self.record(outcome)
    }

    fn run(&mut self, sql: &str) -> Result<Option<Box<dyn NativeCursor>>, NativeDiagnostic> {
        let autocommit = self.autocommit;
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| NativeDiagnostic::new(-1, "Not connected to a database"))?;
        if !autocommit && conn.is_autocommit() {
            conn.execute_batch("BEGIN").map_err(diagnostic)?;
        }

        let mut stmt = conn.prepare(sql).map_err(diagnostic)?;
        let column_count = stmt.column_count();
        if column_count == 0 {
            let changed = stmt.execute([]).map_err(diagnostic)?;
            self.affected = u64::try_from(changed).unwrap_or(u64::MAX);
            self.fields = 0;
            return Ok(None);
        }

        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let mut rows: Vec<Vec<RowValues>> = Vec::new();
        let mut cursor = stmt.query([]).map_err(diagnostic)?;
        while let Some(row) = cursor.next().map_err(diagnostic)? {
            let mut values = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                let value: Value = row.get(idx).map_err(diagnostic)?;
                values.push(from_sqlite_value(value));
            }
            rows.push(values);
        }

        let fields = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| FieldInfo {
                index,
                name,
                type_name: rows
                    .first()
                    .and_then(|r| r.get(index))
                    .map(|v| type_name(v).to_string()),
            })
            .collect();

        self.affected = 0;
        self.fields = column_count;
        Ok(Some(Box::new(BufferedCursor::new(fields, rows))))
    }
}

impl NativeConnection for SqliteConnection {
    fn set_autocommit(&mut self, enabled: bool) -> Result<(), NativeDiagnostic> {
        if enabled {
            self.end_transaction("COMMIT")?;
        }
        self.autocommit = enabled;
        Ok(())
    }

    fn query(&mut self, sql: &str) -> Result<Option<Box<dyn NativeCursor>>, NativeDiagnostic> {
        let outcome = self.run(sql);
        self.record(outcome)
    }

    fn escape_string(&self, value: &str) -> String {
        value.replace('\'', "''")
    }

    fn insert_id(&self) -> i64 {
        self.conn.as_ref().map_or(0, rusqlite::Connection::last_insert_rowid)
    }

    fn affected_rows(&self) -> u64 {
        self.affected
    }

    fn field_count(&self) -> usize {
        self.fields
    }

    fn commit(&mut self) -> Result<(), NativeDiagnostic> {
        self.end_transaction("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), NativeDiagnostic> {
        self.end_transaction("ROLLBACK")
    }

    fn close(&mut self) -> Result<(), NativeDiagnostic> {
        match self.conn.take() {
            Some(conn) => {
                let outcome = conn.close().map_err(|(_, err)| diagnostic(err));
                self.record(outcome)
            }
            None => Ok(()),
        }
    }

    fn error_code(&self) -> i32 {
        self.last_error.as_ref().map_or(0, |d| d.code)
    }

    fn error_message(&self) -> String {
        self.last_error
            .as_ref()
            .map(|d| d.message.clone())
            .unwrap_or_default()
    }
}

fn diagnostic(err: rusqlite::Error) -> NativeDiagnostic {
    let code = match &err {
        rusqlite::Error::SqliteFailure(ffi, _) => ffi.extended_code,
        _ => -1,
    };
    NativeDiagnostic::new(code, err.to_string())
}

fn from_sqlite_value(value: Value) -> RowValues {
    match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    }
}

fn type_name(value: &RowValues) -> &'static str {
    match value {
        RowValues::Int(_) | RowValues::Bool(_) => "integer",
        RowValues::Float(_) => "real",
        RowValues::Text(_) | RowValues::Timestamp(_) | RowValues::JSON(_) => "text",
        RowValues::Blob(_) => "blob",
        RowValues::Null => "null",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> Box<dyn NativeConnection> {
        SqliteDriver
            .connect(&Dsn::from_pairs([("dbn", ":memory:")]), false)
            .unwrap()
    }

    fn count(conn: &mut dyn NativeConnection) -> Option<Vec<RowValues>> {
        conn.query("SELECT count(*) FROM t").unwrap().unwrap().next_row()
    }

    #[test]
    fn manual_autocommit_keeps_transaction_open_until_rollback() {
        let mut conn = open();
        conn.query("CREATE TABLE t (id INTEGER)").unwrap();
        conn.set_autocommit(false).unwrap();
        conn.query("INSERT INTO t VALUES (1)").unwrap();
        assert_eq!(conn.affected_rows(), 1);
        conn.rollback().unwrap();
        assert_eq!(count(conn.as_mut()), Some(vec![RowValues::Int(0)]));

        conn.query("INSERT INTO t VALUES (2)").unwrap();
        conn.commit().unwrap();
        conn.rollback().unwrap();
        assert_eq!(count(conn.as_mut()), Some(vec![RowValues::Int(1)]));
    }

    #[test]
    fn failures_are_recorded_then_cleared() {
        let mut conn = open();
        let diag = conn.query("SELEC nonsense").err().unwrap();
        assert_ne!(diag.code, 0);
        assert_eq!(conn.error_code(), diag.code);
        assert!(conn.error_message().contains("syntax error"));

        conn.query("SELECT 1").unwrap();
        assert_eq!(conn.error_code(), 0);
        assert_eq!(conn.error_message(), "");
    }

    #[test]
    fn escape_doubles_single_quotes() {
        let conn = open();
        assert_eq!(conn.escape_string("O'Brien"), "O''Brien");
    }

    #[test]
    fn missing_dbn_is_a_connect_failure() {
        let err = SqliteDriver
            .connect(&Dsn::from_pairs([("uid", "u")]), false)
            .err()
            .unwrap();
        assert_eq!(err.code, -1);
    }
}
