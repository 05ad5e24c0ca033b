//! Synchronous client driver for engines that speak SQL Anywhere's native
//! client API.
//!
//! That API has no bind-parameter protocol, reports failures as a numeric
//! code plus message, and exposes autocommit as a connection flag. This crate
//! puts a conventional connect / prepare / bind / execute / fetch surface on
//! top of it:
//!
//! - [`Connector`] builds the connection string from a [`ConnectionConfig`],
//!   opens a [`Client`], and classifies lost-connection failures;
//! - [`Client`] owns one native connection and releases it on drop;
//! - [`Statement`] compiles bindings into literal SQL on every execution;
//! - [`QueryResult`] fetches rows in several shapes from a forward-only cursor.
//!
//! ```rust
//! # #[cfg(feature = "sqlite")]
//! # fn demo() -> Result<(), sql_anywhere::SqlAnywhereError> {
//! use std::sync::Arc;
//! use sql_anywhere::prelude::*;
//!
//! let config = ConnectionConfig::new()
//!     .with_host("localhost")
//!     .with_port(2638)
//!     .with_database(":memory:")
//!     .with_username("dba")
//!     .with_password("sql");
//! let client = Connector::new(Arc::new(SqliteDriver)).connect(&config)?;
//!
//! client.query("CREATE TABLE users (id INTEGER, name TEXT)")?;
//! client
//!     .prepare("INSERT INTO users VALUES (?, :name)")
//!     .bind_value(0usize, 1)
//!     .bind_value("name", "O'Brien")
//!     .execute(Bindings::new())?;
//!
//! let rows = client.select("SELECT name FROM users", Bindings::new())?;
//! assert_eq!(rows[0].get("name"), Some(&RowValues::Text("O'Brien".into())));
//! # Ok(())
//! # }
//! # #[cfg(feature = "sqlite")]
//! # demo().unwrap();
//! ```
//!
//! All calls block. One [`Client`] wraps exactly one connection and must be
//! used from one thread of control at a time; pooling and retries belong to
//! the caller.

pub mod client;
pub mod config;
pub mod connector;
pub mod error;
pub mod native;
pub mod prelude;
pub mod results;
pub mod statement;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use client::Client;
pub use config::{ConnectionConfig, ConnectionOptions, Dsn};
pub use connector::{Connector, LOST_CONNECTION_MESSAGES, is_lost_connection_message};
pub use error::{ERR_CONNECTION, ERR_DRIVER_UNAVAILABLE, ERR_QUERY, Result, SqlAnywhereError};
pub use results::{QueryResult, Record, Row};
pub use statement::{Bindings, CompiledQuery, Statement};
pub use types::{BindKey, ColumnKey, FetchMode, RowValues};
