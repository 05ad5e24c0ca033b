use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde_json::Value as JsonValue;

/// Values that can be bound to a statement or read back from a result row.
///
/// ```rust
/// use sql_anywhere::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the value counts as empty when bound positionally.
    ///
    /// Empty positional values are sent as a bare `NULL`. Note that `0`,
    /// `0.0`, `false`, `""` and `"0"` all count as empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            RowValues::Null => true,
            RowValues::Int(i) => *i == 0,
            RowValues::Float(f) => *f == 0.0,
            RowValues::Bool(b) => !*b,
            RowValues::Text(s) => s.is_empty() || s == "0",
            RowValues::Blob(bytes) => bytes.is_empty(),
            RowValues::Timestamp(_) | RowValues::JSON(_) => false,
        }
    }

    /// Unescaped text of the value as it appears inside a quoted SQL literal.
    #[must_use]
    pub fn to_bind_text(&self) -> String {
        match self {
            RowValues::Int(i) => i.to_string(),
            RowValues::Float(f) => f.to_string(),
            RowValues::Text(s) => s.clone(),
            RowValues::Bool(true) => "1".to_string(),
            RowValues::Bool(false) | RowValues::Null => String::new(),
            RowValues::Timestamp(dt) => dt.format("%F %T%.f").to_string(),
            RowValues::JSON(jval) => jval.to_string(),
            RowValues::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Convert to a JSON value, used by the OBJECT fetch shape.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            RowValues::Int(i) => JsonValue::from(*i),
            RowValues::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(JsonValue::Null, JsonValue::Number),
            RowValues::Text(s) => JsonValue::String(s.clone()),
            RowValues::Bool(b) => JsonValue::Bool(*b),
            RowValues::Timestamp(dt) => JsonValue::String(dt.format("%F %T%.f").to_string()),
            RowValues::Null => JsonValue::Null,
            RowValues::JSON(jval) => jval.clone(),
            RowValues::Blob(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }
}

macro_rules! row_values_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for RowValues {
                fn from(value: $ty) -> Self {
                    RowValues::$variant(value.into())
                }
            }
        )*
    };
}

row_values_from! {
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
    bool => Bool,
    String => Text,
    &str => Text,
    NaiveDateTime => Timestamp,
    JsonValue => JSON,
    Vec<u8> => Blob,
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Key of a binding: a positional index for `?` tokens or a `:name` token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindKey {
    Position(usize),
    /// Always stored with its leading `:`.
    Name(String),
}

impl BindKey {
    /// Build a named key, adding the `:` prefix when missing.
    #[must_use]
    pub fn name(name: &str) -> Self {
        if name.starts_with(':') {
            BindKey::Name(name.to_string())
        } else {
            BindKey::Name(format!(":{name}"))
        }
    }
}

impl From<usize> for BindKey {
    fn from(index: usize) -> Self {
        BindKey::Position(index)
    }
}

impl From<&str> for BindKey {
    fn from(name: &str) -> Self {
        BindKey::name(name)
    }
}

impl From<String> for BindKey {
    fn from(name: String) -> Self {
        BindKey::name(&name)
    }
}

/// Key of one entry in the mixed ARRAY fetch shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnKey {
    Index(usize),
    Name(String),
}

/// Shape requested from [`crate::QueryResult::fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum FetchMode {
    /// Field-name keyed row
    #[default]
    Assoc,
    /// Positional sequence of values
    Row,
    /// Next field descriptor of the result
    Field,
    /// Structured JSON object
    Object,
    /// Mixed layout: every value under both its index and its name
    Array,
}

impl FetchMode {
    /// Parse a fetch-mode name; anything unrecognised selects the mixed
    /// [`FetchMode::Array`] shape.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        <FetchMode as ValueEnum>::from_str(name, true).unwrap_or(FetchMode::Array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emptiness_follows_loose_falsiness() {
        for empty in [
            RowValues::Null,
            RowValues::Int(0),
            RowValues::Float(0.0),
            RowValues::Bool(false),
            RowValues::Text(String::new()),
            RowValues::Text("0".into()),
            RowValues::Blob(Vec::new()),
        ] {
            assert!(empty.is_empty(), "{empty:?} should be empty");
        }
        for full in [
            RowValues::Int(-1),
            RowValues::Text("00".into()),
            RowValues::Text(" ".into()),
            RowValues::Bool(true),
            RowValues::JSON(serde_json::json!([])),
        ] {
            assert!(!full.is_empty(), "{full:?} should not be empty");
        }
    }

    #[test]
    fn bind_text() {
        assert_eq!(RowValues::Int(5).to_bind_text(), "5");
        assert_eq!(RowValues::Float(100.75).to_bind_text(), "100.75");
        assert_eq!(RowValues::Bool(true).to_bind_text(), "1");
        assert_eq!(RowValues::Bool(false).to_bind_text(), "");
        let dt = NaiveDateTime::parse_from_str("2024-01-02 03:04:05", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(RowValues::Timestamp(dt).to_bind_text(), "2024-01-02 03:04:05");
        assert_eq!(
            RowValues::JSON(serde_json::json!({"a": 1})).to_bind_text(),
            r#"{"a":1}"#
        );
    }

    #[test]
    fn bind_keys_are_colon_prefixed() {
        assert_eq!(BindKey::from("id"), BindKey::Name(":id".into()));
        assert_eq!(BindKey::from(":id"), BindKey::Name(":id".into()));
        assert_eq!(BindKey::from(3usize), BindKey::Position(3));
    }

    #[test]
    fn fetch_mode_parsing() {
        assert_eq!(FetchMode::parse("assoc"), FetchMode::Assoc);
        assert_eq!(FetchMode::parse("OBJECT"), FetchMode::Object);
        assert_eq!(FetchMode::parse("field"), FetchMode::Field);
        assert_eq!(FetchMode::parse("whatever"), FetchMode::Array);
        assert_eq!(FetchMode::default(), FetchMode::Assoc);
    }

    #[test]
    fn option_conversion() {
        assert_eq!(RowValues::from(None::<i64>), RowValues::Null);
        assert_eq!(RowValues::from(Some("x")), RowValues::Text("x".into()));
    }
}
