use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::results::Row;
use crate::types::RowValues;

/// Create a field-name keyed row with the given column names and values.
#[must_use]
pub fn create_test_row(column_names: Vec<String>, values: Vec<RowValues>) -> Row {
    Row::new(Arc::new(column_names), values)
}

/// A config with every required key set, pointing `database` at `dbn`.
#[must_use]
pub fn test_config(dbn: &str) -> ConnectionConfig {
    ConnectionConfig::new()
        .with_host("localhost")
        .with_port(2638)
        .with_database(dbn)
        .with_username("dba")
        .with_password("sql")
}
