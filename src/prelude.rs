//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types so that
//! `use sql_anywhere::prelude::*;` is enough to connect, bind and fetch.

pub use crate::client::Client;
pub use crate::config::{ConnectionConfig, ConnectionOptions, Dsn, OptionOverrides};
pub use crate::connector::Connector;
pub use crate::error::{Result, SqlAnywhereError};
pub use crate::native::{FieldInfo, NativeDriver};
pub use crate::results::{QueryResult, Record, Row};
pub use crate::statement::{Bindings, CompiledQuery, Statement};
pub use crate::types::{BindKey, ColumnKey, FetchMode, RowValues};

#[cfg(feature = "sqlite")]
pub use crate::native::sqlite::SqliteDriver;
