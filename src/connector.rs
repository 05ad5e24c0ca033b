use std::error::Error as StdError;
use std::sync::Arc;

use tracing::debug;

use crate::client::Client;
use crate::config::{ConnectionConfig, ConnectionOptions, Dsn};
use crate::error::Result;
use crate::native::NativeDriver;

/// Message fragments that indicate the connection itself went away.
///
/// Matching is a plain substring test; callers use it to decide whether a
/// reconnect is worth attempting.
pub const LOST_CONNECTION_MESSAGES: &[&str] = &[
    "Authentication violation",
    "server has gone away",
    "no connection to the server",
    "Lost connection",
    "is dead or not enabled",
    "Error while sending",
    "decryption failed or bad record mac",
    "server closed the connection unexpectedly",
    "SSL connection has been closed unexpectedly",
    "Error writing data to the connection",
    "Resource deadlock avoided",
    "Transaction() on null",
    "child connection forced to terminate due to client_idle_limit",
    "query_wait_timeout",
    "reset by peer",
    "Physical connection is not usable",
    "TCP Provider: Error code 0x68",
    "Name or service not known",
    "Not connected to a database",
];

/// Whether `message` contains any of [`LOST_CONNECTION_MESSAGES`].
#[must_use]
pub fn is_lost_connection_message(message: &str) -> bool {
    LOST_CONNECTION_MESSAGES
        .iter()
        .any(|fragment| message.contains(fragment))
}

/// Turns connection settings into an open [`Client`].
///
/// The connector never retries; [`Connector::caused_by_lost_connection`]
/// only classifies failures for whoever owns the reconnect policy.
#[derive(Clone)]
pub struct Connector {
    driver: Arc<dyn NativeDriver>,
    defaults: ConnectionOptions,
}

impl Connector {
    #[must_use]
    pub fn new(driver: Arc<dyn NativeDriver>) -> Self {
        Self {
            driver,
            defaults: ConnectionOptions::default(),
        }
    }

    /// Replace the built-in default options. Per-config overrides still win.
    #[must_use]
    pub fn with_defaults(mut self, defaults: ConnectionOptions) -> Self {
        self.defaults = defaults;
        self
    }

    #[must_use]
    pub fn driver(&self) -> &Arc<dyn NativeDriver> {
        &self.driver
    }

    /// Build the connection string for `config`.
    ///
    /// # Errors
    /// Returns `SqlAnywhereError::ConfigError` listing the missing required keys.
    pub fn get_dsn(&self, config: &ConnectionConfig) -> Result<Dsn> {
        Dsn::from_config(config)
    }

    /// The connector defaults with the config's overrides applied.
    #[must_use]
    pub fn options(&self, config: &ConnectionConfig) -> ConnectionOptions {
        self.defaults.merged(config.overrides())
    }

    /// Build the DSN, merge options and open a client.
    ///
    /// # Errors
    /// Returns the configuration error from DSN construction, or whatever
    /// [`Client::new`] fails with, unchanged.
    pub fn connect(&self, config: &ConnectionConfig) -> Result<Client> {
        let dsn = self.get_dsn(config)?;
        let options = self.options(config);
        debug!(
            driver = self.driver.name(),
            name = config.name.as_deref().unwrap_or(""),
            dsn = %dsn.redacted(),
            ?options,
            "connecting"
        );
        Client::new(self.driver.as_ref(), dsn, options)
    }

    /// Whether `err` looks like the connection was lost, judged from its message.
    #[must_use]
    pub fn caused_by_lost_connection(err: &(dyn StdError + 'static)) -> bool {
        is_lost_connection_message(&err.to_string())
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("driver", &self.driver.name())
            .field("defaults", &self.defaults)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_matches_fragments_anywhere_in_message() {
        assert!(is_lost_connection_message("SQLSTATE[HY000]: server has gone away"));
        assert!(is_lost_connection_message("Lost connection to MySQL server"));
        assert!(is_lost_connection_message("read: Connection reset by peer"));
        assert!(is_lost_connection_message("Database server is dead or not enabled"));
        assert!(!is_lost_connection_message("syntax error near X"));
        assert!(!is_lost_connection_message("lost connection"));
    }

    #[test]
    fn classifies_any_error_by_message() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "query_wait_timeout exceeded");
        assert!(Connector::caused_by_lost_connection(&io));
        let io = std::io::Error::new(std::io::ErrorKind::Other, "permission denied");
        assert!(!Connector::caused_by_lost_connection(&io));
    }
}
