use std::cell::RefCell;
use std::fmt;

use tracing::{debug, trace, warn};

use crate::config::{ConnectionOptions, Dsn};
use crate::error::{Result, SqlAnywhereError};
use crate::native::{NativeConnection, NativeDiagnostic, NativeDriver};
use crate::results::{QueryResult, Row};
use crate::statement::{Bindings, Statement};

/// Owner of exactly one native connection.
///
/// The connection is opened by [`Client::new`] and released either by
/// [`Client::close`] or, best effort, when the client is dropped: a commit
/// followed by a close, with failures logged and swallowed. A `Client` may be
/// moved between threads but is not `Sync`; statements and results borrow it.
pub struct Client {
    conn: RefCell<Option<Box<dyn NativeConnection>>>,
    dsn: Dsn,
    options: ConnectionOptions,
}

impl Client {
    /// Open a connection through `driver` and apply the autocommit option.
    ///
    /// # Errors
    /// Returns `SqlAnywhereError::DriverUnavailable` (code 100) when the
    /// engine runtime is missing, or `SqlAnywhereError::ConnectionError`
    /// (code 101) carrying the engine diagnostic when connecting fails.
    pub fn new(driver: &dyn NativeDriver, dsn: Dsn, options: ConnectionOptions) -> Result<Self> {
        if !driver.is_available() {
            return Err(SqlAnywhereError::DriverUnavailable(format!(
                "{} client runtime is not available in this process",
                driver.name()
            )));
        }

        let mut conn = driver
            .connect(&dsn, options.persistent)
            .map_err(|diag| SqlAnywhereError::connection(&diag))?;

        if let Err(diag) = conn.set_autocommit(options.autocommit) {
            warn!(driver = driver.name(), %diag, "failed to set autocommit option");
        }
        debug!(driver = driver.name(), ?options, "connected");

        Ok(Self {
            conn: RefCell::new(Some(conn)),
            dsn,
            options,
        })
    }

    /// Run `func` against the live connection, if there is one.
    fn with_conn<R>(&self, func: impl FnOnce(&mut dyn NativeConnection) -> R) -> Option<R> {
        let mut guard = self.conn.borrow_mut();
        match guard.as_mut() {
            Some(conn) => Some(func(&mut **conn)),
            None => None,
        }
    }

    #[must_use]
    pub fn dsn(&self) -> &Dsn {
        &self.dsn
    }

    /// Options the connection was opened with, defaults already merged.
    #[must_use]
    pub fn options(&self) -> ConnectionOptions {
        self.options
    }

    /// Code of the last engine diagnostic, `0` without a live connection.
    #[must_use]
    pub fn error_code(&self) -> i32 {
        self.with_conn(|conn| conn.error_code()).unwrap_or(0)
    }

    /// Message of the last engine diagnostic, `"Unknown error"` without a live connection.
    #[must_use]
    pub fn error_info(&self) -> String {
        self.with_conn(|conn| conn.error_message())
            .unwrap_or_else(|| "Unknown error".to_string())
    }

    /// Execute literal SQL, no binding involved.
    ///
    /// # Errors
    /// Returns `SqlAnywhereError::QueryError` (code 110) with the engine diagnostic.
    pub fn query(&self, sql: &str) -> Result<QueryResult<'_>> {
        self.run(sql)
    }

    pub(crate) fn run(&self, sql: &str) -> Result<QueryResult<'_>> {
        trace!(sql, "executing");
        let cursor = self
            .with_conn(|conn| conn.query(sql))
            .unwrap_or_else(|| Err(not_connected()))
            .map_err(|diag| SqlAnywhereError::query(&diag))?;
        Ok(QueryResult::new(self, cursor))
    }

    /// Create a statement. Nothing reaches the engine until it is executed.
    pub fn prepare(&self, sql: impl Into<String>) -> Statement<'_> {
        Statement::new(self, sql.into())
    }

    pub(crate) fn escape(&self, value: &str) -> Result<String> {
        self.with_conn(|conn| conn.escape_string(value))
            .ok_or_else(|| SqlAnywhereError::query(&not_connected()))
    }

    /// Identity value generated by the most recent insert, `0` if not applicable.
    #[must_use]
    pub fn last_insert_id(&self) -> i64 {
        self.with_conn(|conn| conn.insert_id()).unwrap_or(0)
    }

    pub(crate) fn affected_rows(&self) -> u64 {
        self.with_conn(|conn| conn.affected_rows()).unwrap_or(0)
    }

    pub(crate) fn field_count(&self) -> usize {
        self.with_conn(|conn| conn.field_count()).unwrap_or(0)
    }

    /// Always reports success; the engine has no explicit begin call and the
    /// autocommit option decides statement grouping.
    pub fn begin_transaction(&self) -> bool {
        debug!("begin transaction requested (no-op)");
        true
    }

    pub fn commit(&self) -> bool {
        self.finish_transaction("commit", |conn| conn.commit())
    }

    pub fn rollback(&self) -> bool {
        self.finish_transaction("rollback", |conn| conn.rollback())
    }

    fn finish_transaction(
        &self,
        action: &'static str,
        func: impl FnOnce(&mut dyn NativeConnection) -> std::result::Result<(), NativeDiagnostic>,
    ) -> bool {
        match self.with_conn(func) {
            Some(Ok(())) => {
                debug!(action, "transaction finished");
                true
            }
            Some(Err(diag)) => {
                debug!(action, %diag, "transaction call failed");
                false
            }
            None => false,
        }
    }

    /// Prepare, execute and fetch every row as a field-name keyed [`Row`].
    ///
    /// # Errors
    /// Returns `SqlAnywhereError::QueryError` if execution fails.
    pub fn select(&self, sql: &str, bindings: Bindings) -> Result<Vec<Row>> {
        let mut result = self.prepare(sql).execute(bindings)?;
        Ok(result.fetch_all_assoc())
    }

    /// Prepare and execute, returning the number of rows changed.
    ///
    /// # Errors
    /// Returns `SqlAnywhereError::QueryError` if execution fails.
    pub fn affecting_statement(&self, sql: &str, bindings: Bindings) -> Result<u64> {
        let result = self.prepare(sql).execute(bindings)?;
        Ok(result.affected_rows())
    }

    /// Commit and close now, reporting failures instead of swallowing them.
    ///
    /// # Errors
    /// Returns `SqlAnywhereError::ConnectionError` with the first engine
    /// diagnostic raised by the commit or the close. The connection is
    /// released either way.
    pub fn close(self) -> Result<()> {
        let conn = self.conn.borrow_mut().take();
        match conn {
            Some(mut conn) => {
                release(conn.as_mut()).map_err(|diag| SqlAnywhereError::connection(&diag))
            }
            None => Ok(()),
        }
    }
}

/// Commit, then close. Both are attempted; the first failure is returned.
fn release(conn: &mut dyn NativeConnection) -> std::result::Result<(), NativeDiagnostic> {
    let committed = conn.commit();
    let closed = conn.close();
    committed.and(closed)
}

fn not_connected() -> NativeDiagnostic {
    NativeDiagnostic::new(0, "Not connected to a database")
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(mut conn) = self.conn.get_mut().take()
            && let Err(diag) = release(conn.as_mut())
        {
            warn!(%diag, "ignoring failure while releasing connection");
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("dsn", &self.dsn)
            .field("options", &self.options)
            .field("connected", &self.conn.borrow().is_some())
            .finish()
    }
}
