use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::Dsn;
use crate::native::{
    BufferedCursor, NativeConnection, NativeCursor, NativeDiagnostic, NativeDriver,
};
use crate::types::RowValues;

/// A native call observed by the mock, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Connect { dsn: String, persistent: bool },
    SetAutocommit(bool),
    Query(String),
    Commit,
    Rollback,
    Close,
}

/// Scripted reply to the next `query` call.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<RowValues>>,
    },
    Affected(u64),
    Fail(NativeDiagnostic),
}

#[derive(Debug, Default)]
struct MockState {
    unavailable: bool,
    connect_error: Option<NativeDiagnostic>,
    commit_error: Option<NativeDiagnostic>,
    close_error: Option<NativeDiagnostic>,
    insert_id: i64,
    responses: VecDeque<MockResponse>,
    events: Vec<MockEvent>,
}

/// Scripted engine that records every call made through it.
///
/// Clones share state, so a test can keep one handle for inspection after
/// handing another to a [`crate::Connector`]. Queries with no queued
/// response succeed with zero affected rows.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }

    /// Report the engine runtime as missing.
    #[must_use]
    pub fn unavailable(self) -> Self {
        self.lock().unavailable = true;
        self
    }

    #[must_use]
    pub fn fail_connect(self, code: i32, message: &str) -> Self {
        self.lock().connect_error = Some(NativeDiagnostic::new(code, message));
        self
    }

    #[must_use]
    pub fn fail_commit(self, code: i32, message: &str) -> Self {
        self.lock().commit_error = Some(NativeDiagnostic::new(code, message));
        self
    }

    #[must_use]
    pub fn fail_close(self, code: i32, message: &str) -> Self {
        self.lock().close_error = Some(NativeDiagnostic::new(code, message));
        self
    }

    #[must_use]
    pub fn with_insert_id(self, id: i64) -> Self {
        self.lock().insert_id = id;
        self
    }

    pub fn push_rows(&self, columns: &[&str], rows: Vec<Vec<RowValues>>) {
        self.lock().responses.push_back(MockResponse::Rows {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
        });
    }

    pub fn push_affected(&self, rows: u64) {
        self.lock().responses.push_back(MockResponse::Affected(rows));
    }

    pub fn push_failure(&self, code: i32, message: &str) {
        self.lock()
            .responses
            .push_back(MockResponse::Fail(NativeDiagnostic::new(code, message)));
    }

    #[must_use]
    pub fn events(&self) -> Vec<MockEvent> {
        self.lock().events.clone()
    }

    /// SQL text of every `query` call, in order.
    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                MockEvent::Query(sql) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NativeDriver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_available(&self) -> bool {
        !self.lock().unavailable
    }

    fn connect(
        &self,
        dsn: &Dsn,
        persistent: bool,
    ) -> Result<Box<dyn NativeConnection>, NativeDiagnostic> {
        let mut state = self.lock();
        state.events.push(MockEvent::Connect {
            dsn: dsn.to_string(),
            persistent,
        });
        if let Some(diag) = state.connect_error.clone() {
            return Err(diag);
        }
        Ok(Box::new(MockConnection {
            state: Arc::clone(&self.state),
            affected: 0,
            fields: 0,
            last_error: None,
            closed: false,
        }))
    }
}

struct MockConnection {
    state: Arc<Mutex<MockState>>,
    affected: u64,
    fields: usize,
    last_error: Option<NativeDiagnostic>,
    closed: bool,
}

impl MockConnection {
    fn event(&self, event: MockEvent) {
        lock(&self.state).events.push(event);
    }

    fn record<T>(&mut self, outcome: Result<T, NativeDiagnostic>) -> Result<T, NativeDiagnostic> {
        self.last_error = outcome.as_ref().err().cloned();
        outcome
    }
}

impl NativeConnection for MockConnection {
    fn set_autocommit(&mut self, enabled: bool) -> Result<(), NativeDiagnostic> {
        self.event(MockEvent::SetAutocommit(enabled));
        Ok(())
    }

    fn query(&mut self, sql: &str) -> Result<Option<Box<dyn NativeCursor>>, NativeDiagnostic> {
        self.event(MockEvent::Query(sql.to_string()));
        if self.closed {
            let outcome = Err(NativeDiagnostic::new(-101, "Not connected to a database"));
            return self.record(outcome);
        }
        let response = lock(&self.state)
            .responses
            .pop_front()
            .unwrap_or(MockResponse::Affected(0));
        let outcome: Result<Option<Box<dyn NativeCursor>>, NativeDiagnostic> = match response {
            MockResponse::Rows { columns, rows } => {
                self.affected = 0;
                self.fields = columns.len();
                Ok(Some(Box::new(BufferedCursor::from_columns(columns, rows))))
            }
            MockResponse::Affected(n) => {
                self.affected = n;
                self.fields = 0;
                Ok(None)
            }
            MockResponse::Fail(diag) => Err(diag),
        };
        self.record(outcome)
    }

    /// Backslash escaping, as the engine's client library does it.
    fn escape_string(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        for ch in value.chars() {
            match ch {
                '\0' => out.push_str("\\0"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\\' => out.push_str("\\\\"),
                '\'' => out.push_str("\\'"),
                '"' => out.push_str("\\\""),
                '\x1a' => out.push_str("\\Z"),
                other => out.push(other),
            }
        }
        out
    }

    fn insert_id(&self) -> i64 {
        lock(&self.state).insert_id
    }

    fn affected_rows(&self) -> u64 {
        self.affected
    }

    fn field_count(&self) -> usize {
        self.fields
    }

    fn commit(&mut self) -> Result<(), NativeDiagnostic> {
        self.event(MockEvent::Commit);
        let outcome = match lock(&self.state).commit_error.clone() {
            Some(diag) => Err(diag),
            None => Ok(()),
        };
        self.record(outcome)
    }

    fn rollback(&mut self) -> Result<(), NativeDiagnostic> {
        self.event(MockEvent::Rollback);
        self.record(Ok(()))
    }

    fn close(&mut self) -> Result<(), NativeDiagnostic> {
        self.event(MockEvent::Close);
        self.closed = true;
        let outcome = match lock(&self.state).close_error.clone() {
            Some(diag) => Err(diag),
            None => Ok(()),
        };
        self.record(outcome)
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
