use thiserror::Error;

use crate::native::NativeDiagnostic;

/// Stable code: the native driver/extension is not available.
pub const ERR_DRIVER_UNAVAILABLE: u32 = 100;
/// Stable code: establishing the native connection failed.
pub const ERR_CONNECTION: u32 = 101;
/// Stable code: a query or statement failed to execute.
pub const ERR_QUERY: u32 = 110;

#[derive(Debug, Error)]
pub enum SqlAnywhereError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Driver unavailable: {0}")]
    DriverUnavailable(String),

    #[error("{message}")]
    ConnectionError { native_code: i32, message: String },

    #[error("{message}")]
    QueryError { native_code: i32, message: String },

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

impl SqlAnywhereError {
    pub(crate) fn connection(diag: &NativeDiagnostic) -> Self {
        SqlAnywhereError::ConnectionError {
            native_code: diag.code,
            message: format!("Connection problem: {}", diag.message),
        }
    }

    pub(crate) fn query(diag: &NativeDiagnostic) -> Self {
        SqlAnywhereError::QueryError {
            native_code: diag.code,
            message: format!("SQL-query problem: {}", diag.message),
        }
    }

    /// The stable driver code for this failure (`100`, `101`, `110`), or `0`
    /// for failures raised before the native layer is involved.
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            SqlAnywhereError::DriverUnavailable(_) => ERR_DRIVER_UNAVAILABLE,
            SqlAnywhereError::ConnectionError { .. } => ERR_CONNECTION,
            SqlAnywhereError::QueryError { .. } => ERR_QUERY,
            SqlAnywhereError::ConfigError(_)
            | SqlAnywhereError::ParameterError(_)
            | SqlAnywhereError::JsonError(_) => 0,
        }
    }

    /// The engine's own diagnostic code, when the failure came from the engine.
    #[must_use]
    pub fn native_code(&self) -> Option<i32> {
        match self {
            SqlAnywhereError::ConnectionError { native_code, .. }
            | SqlAnywhereError::QueryError { native_code, .. } => Some(*native_code),
            _ => None,
        }
    }

    /// Structured form of [`crate::Connector::caused_by_lost_connection`].
    ///
    /// Configuration and driver-availability failures never count as a lost
    /// connection; everything else is matched against the fragment catalogue.
    #[must_use]
    pub fn is_lost_connection(&self) -> bool {
        match self {
            SqlAnywhereError::ConfigError(_) | SqlAnywhereError::DriverUnavailable(_) => false,
            other => crate::connector::is_lost_connection_message(&other.to_string()),
        }
    }
}

pub type Result<T, E = SqlAnywhereError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(code: i32, message: &str) -> NativeDiagnostic {
        NativeDiagnostic {
            code,
            message: message.to_string(),
        }
    }

    #[test]
    fn stable_codes() {
        assert_eq!(
            SqlAnywhereError::DriverUnavailable("x".into()).code(),
            ERR_DRIVER_UNAVAILABLE
        );
        assert_eq!(SqlAnywhereError::connection(&diag(-100, "down")).code(), 101);
        assert_eq!(SqlAnywhereError::query(&diag(-131, "syntax")).code(), 110);
        assert_eq!(SqlAnywhereError::ConfigError("x".into()).code(), 0);
    }

    #[test]
    fn native_diagnostic_is_preserved() {
        let err = SqlAnywhereError::query(&diag(-141, "Table 'nope' not found"));
        assert_eq!(err.native_code(), Some(-141));
        assert_eq!(err.to_string(), "SQL-query problem: Table 'nope' not found");
    }

    #[test]
    fn structured_lost_connection() {
        assert!(SqlAnywhereError::query(&diag(-308, "Lost connection to server")).is_lost_connection());
        assert!(!SqlAnywhereError::query(&diag(-131, "syntax error near X")).is_lost_connection());
        assert!(!SqlAnywhereError::ConfigError("reset by peer".into()).is_lost_connection());
    }
}
