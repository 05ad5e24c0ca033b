//! The seam between the driver layer and a concrete engine.
//!
//! The engine API this crate adapts has no bind-parameter protocol: it takes
//! literal SQL text, reports failures as a numeric code plus message, and
//! exposes autocommit as a connection flag. These traits capture exactly
//! that surface so [`crate::Client`] never names a concrete engine.

use std::collections::VecDeque;
use std::fmt;

use crate::config::Dsn;
use crate::types::RowValues;

#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Diagnostic reported by the engine: its numeric code and message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeDiagnostic {
    pub code: i32,
    pub message: String,
}

impl NativeDiagnostic {
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for NativeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Describes one column of a result set (the FIELD fetch shape).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub index: usize,
    pub name: String,
    /// Engine type name, when the engine reports one.
    pub type_name: Option<String>,
}

/// Entry point of an engine client library.
pub trait NativeDriver: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Whether the engine's client runtime is present in this process.
    fn is_available(&self) -> bool {
        true
    }

    /// Open a connection. `persistent` selects the engine's persistent
    /// connect call instead of the transient one.
    ///
    /// # Errors
    /// Returns the engine diagnostic when the connection cannot be opened.
    fn connect(
        &self,
        dsn: &Dsn,
        persistent: bool,
    ) -> Result<Box<dyn NativeConnection>, NativeDiagnostic>;
}

/// One live engine connection.
pub trait NativeConnection: Send {
    /// Set the engine's autocommit flag.
    ///
    /// # Errors
    /// Returns the engine diagnostic when the option is rejected.
    fn set_autocommit(&mut self, enabled: bool) -> Result<(), NativeDiagnostic>;

    /// Run literal SQL. Statements that produce no result set return `None`.
    ///
    /// # Errors
    /// Returns the engine diagnostic when the statement fails.
    fn query(&mut self, sql: &str) -> Result<Option<Box<dyn NativeCursor>>, NativeDiagnostic>;

    /// Escape `value` for use between single quotes.
    fn escape_string(&self, value: &str) -> String;

    /// Identity/autoincrement value of the most recent insert, `0` if none.
    fn insert_id(&self) -> i64;

    /// Rows changed by the most recent statement, `0` for reads.
    fn affected_rows(&self) -> u64;

    /// Number of fields in the most recent result.
    fn field_count(&self) -> usize;

    /// # Errors
    /// Returns the engine diagnostic when the commit fails.
    fn commit(&mut self) -> Result<(), NativeDiagnostic>;

    /// # Errors
    /// Returns the engine diagnostic when the rollback fails.
    fn rollback(&mut self) -> Result<(), NativeDiagnostic>;

    /// Release the connection. Further calls are undefined.
    ///
    /// # Errors
    /// Returns the engine diagnostic when the close fails.
    fn close(&mut self) -> Result<(), NativeDiagnostic>;

    /// Code of the last diagnostic, `0` when the last call succeeded.
    fn error_code(&self) -> i32;

    /// Message of the last diagnostic, empty when the last call succeeded.
    fn error_message(&self) -> String;
}

/// Forward-only, single-pass cursor over one result set.
pub trait NativeCursor: Send {
    fn num_rows(&self) -> usize;

    fn fields(&self) -> &[FieldInfo];

    /// Next row, or `None` once exhausted.
    fn next_row(&mut self) -> Option<Vec<RowValues>>;
}

/// Cursor over a result set the engine has already buffered client-side.
#[derive(Debug, Clone, Default)]
pub struct BufferedCursor {
    fields: Vec<FieldInfo>,
    rows: VecDeque<Vec<RowValues>>,
    total: usize,
}

impl BufferedCursor {
    #[must_use]
    pub fn new(fields: Vec<FieldInfo>, rows: Vec<Vec<RowValues>>) -> Self {
        let total = rows.len();
        Self {
            fields,
            rows: rows.into(),
            total,
        }
    }

    /// Build from bare column names, without engine type names.
    #[must_use]
    pub fn from_columns<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<RowValues>>,
    ) -> Self {
        let fields = columns
            .into_iter()
            .enumerate()
            .map(|(index, name)| FieldInfo {
                index,
                name: name.into(),
                type_name: None,
            })
            .collect();
        Self::new(fields, rows)
    }
}

impl NativeCursor for BufferedCursor {
    fn num_rows(&self) -> usize {
        self.total
    }

    fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    fn next_row(&mut self) -> Option<Vec<RowValues>> {
        self.rows.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_cursor_is_single_pass() {
        let mut cursor = BufferedCursor::from_columns(
            ["id"],
            vec![vec![RowValues::Int(1)], vec![RowValues::Int(2)]],
        );
        assert_eq!(cursor.num_rows(), 2);
        assert_eq!(cursor.fields()[0].name, "id");
        assert_eq!(cursor.next_row(), Some(vec![RowValues::Int(1)]));
        assert_eq!(cursor.next_row(), Some(vec![RowValues::Int(2)]));
        assert_eq!(cursor.next_row(), None);
        assert_eq!(cursor.next_row(), None);
        // the row count is the size of the result, not what remains
        assert_eq!(cursor.num_rows(), 2);
    }
}
