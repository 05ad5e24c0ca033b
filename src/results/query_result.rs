use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use super::row::{Row, index_columns};
use crate::client::Client;
use crate::error::Result;
use crate::native::{FieldInfo, NativeCursor};
use crate::types::{ColumnKey, FetchMode, RowValues};

/// One fetched record, shaped by the requested [`FetchMode`].
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Assoc(Row),
    Row(Vec<RowValues>),
    Field(FieldInfo),
    Object(Map<String, JsonValue>),
    /// Every value twice: under its index, then under its column name.
    Array(Vec<(ColumnKey, RowValues)>),
}

impl Record {
    #[must_use]
    pub fn as_assoc(&self) -> Option<&Row> {
        if let Record::Assoc(row) = self {
            Some(row)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_values(&self) -> Option<&[RowValues]> {
        if let Record::Row(values) = self {
            Some(values)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_field(&self) -> Option<&FieldInfo> {
        if let Record::Field(field) = self {
            Some(field)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Map<String, JsonValue>> {
        if let Record::Object(object) = self {
            Some(object)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[(ColumnKey, RowValues)]> {
        if let Record::Array(entries) = self {
            Some(entries)
        } else {
            None
        }
    }
}

/// Result of one executed query.
///
/// Wraps the engine cursor, which is forward-only: once every row has been
/// fetched the result stays exhausted. Statements that return no result set
/// (DML, DDL) have no cursor; fetching from them yields nothing.
pub struct QueryResult<'c> {
    client: &'c Client,
    cursor: Option<Box<dyn NativeCursor>>,
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
    field_offset: usize,
}

impl<'c> QueryResult<'c> {
    pub(crate) fn new(client: &'c Client, cursor: Option<Box<dyn NativeCursor>>) -> Self {
        let column_names: Vec<String> = cursor
            .as_ref()
            .map(|c| c.fields().iter().map(|f| f.name.clone()).collect())
            .unwrap_or_default();
        let column_index = Arc::new(index_columns(&column_names));
        Self {
            client,
            cursor,
            column_names: Arc::new(column_names),
            column_index,
            field_offset: 0,
        }
    }

    /// Whether the statement produced a result set at all.
    #[must_use]
    pub fn has_cursor(&self) -> bool {
        self.cursor.is_some()
    }

    /// `"row"` counts rows; any other kind counts fields of the connection's last result.
    #[must_use]
    pub fn count(&self, kind: &str) -> usize {
        if kind == "row" {
            self.row_count()
        } else {
            self.field_count()
        }
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.cursor.as_ref().map_or(0, |c| c.num_rows())
    }

    #[must_use]
    pub fn field_count(&self) -> usize {
        self.client.field_count()
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.client.field_count()
    }

    /// Rows changed by the statement, as reported by the connection.
    #[must_use]
    pub fn affected_rows(&self) -> u64 {
        self.client.affected_rows()
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Fetch the next record in the requested shape.
    ///
    /// Returns `None` when there is no cursor or it is exhausted. `Field`
    /// walks the column descriptors instead of the rows and does not move
    /// the row cursor.
    pub fn fetch(&mut self, mode: FetchMode) -> Option<Record> {
        if mode == FetchMode::Field {
            let field = self.cursor.as_ref()?.fields().get(self.field_offset)?.clone();
            self.field_offset += 1;
            return Some(Record::Field(field));
        }

        let values = self.cursor.as_mut()?.next_row()?;
        Some(match mode {
            FetchMode::Assoc => Record::Assoc(self.assoc(values)),
            FetchMode::Row => Record::Row(values),
            FetchMode::Object => Record::Object(self.assoc(values).to_json()),
            FetchMode::Array | FetchMode::Field => Record::Array(self.mixed(values)),
        })
    }

    /// Drain the cursor, keeping row order.
    pub fn fetch_all(&mut self, mode: FetchMode) -> Vec<Record> {
        self.rows(mode).collect()
    }

    /// Forward-only iterator over the remaining records.
    pub fn rows(&mut self, mode: FetchMode) -> Rows<'_, 'c> {
        Rows { result: self, mode }
    }

    pub fn fetch_object(&mut self) -> Option<Map<String, JsonValue>> {
        match self.fetch(FetchMode::Object)? {
            Record::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Decode the next row into `T` through serde, by column name.
    ///
    /// # Errors
    /// Returns `SqlAnywhereError::JsonError` if the row does not fit `T`.
    pub fn fetch_object_as<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        match self.fetch_object() {
            Some(object) => Ok(Some(serde_json::from_value(JsonValue::Object(object))?)),
            None => Ok(None),
        }
    }

    pub fn fetch_assoc(&mut self) -> Option<Row> {
        let values = self.cursor.as_mut()?.next_row()?;
        Some(self.assoc(values))
    }

    pub fn fetch_all_assoc(&mut self) -> Vec<Row> {
        std::iter::from_fn(|| self.fetch_assoc()).collect()
    }

    fn assoc(&self, values: Vec<RowValues>) -> Row {
        Row::with_index(
            Arc::clone(&self.column_names),
            Arc::clone(&self.column_index),
            values,
        )
    }

    fn mixed(&self, values: Vec<RowValues>) -> Vec<(ColumnKey, RowValues)> {
        let mut entries = Vec::with_capacity(values.len() * 2);
        for (index, value) in values.into_iter().enumerate() {
            entries.push((ColumnKey::Index(index), value.clone()));
            let name = self
                .column_names
                .get(index)
                .cloned()
                .unwrap_or_else(|| index.to_string());
            entries.push((ColumnKey::Name(name), value));
        }
        entries
    }
}

impl fmt::Debug for QueryResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("has_cursor", &self.cursor.is_some())
            .field("column_names", &self.column_names)
            .field("field_offset", &self.field_offset)
            .finish()
    }
}

/// Iterator returned by [`QueryResult::rows`].
pub struct Rows<'r, 'c> {
    result: &'r mut QueryResult<'c>,
    mode: FetchMode,
}

impl Iterator for Rows<'_, '_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        self.result.fetch(self.mode)
    }
}
