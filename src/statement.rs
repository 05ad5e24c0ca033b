//! Statement compilation.
//!
//! The engine has no bind protocol, so a statement is compiled into literal
//! SQL every time it runs:
//!
//! 1. stored bindings are merged with the ones passed to `execute`
//!    (execution-time values win);
//! 2. empty positional values become a bare `NULL`, everything else is
//!    escaped by the connection and wrapped in single quotes;
//! 3. `?` tokens are replaced left to right with the positional values in
//!    ascending index order;
//! 4. every `:name` token is replaced by plain text substitution over the
//!    whole query, in binding order.
//!
//! Step 4 is a literal replace: binding `:id` also rewrites the first three
//! characters of `:idx`. Name placeholders so that none is a prefix of another.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, trace};

use crate::client::Client;
use crate::error::Result;
use crate::results::QueryResult;
use crate::types::{BindKey, RowValues};

lazy_static! {
    static ref NAMED_PLACEHOLDER: Regex =
        Regex::new(r":[A-Za-z_][A-Za-z0-9_]*").expect("placeholder pattern is valid");
}

/// Ordered set of bindings.
///
/// Positional values are kept by index; named values keep the order they were
/// first bound in. Binding an existing key again overwrites it in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    positional: BTreeMap<usize, RowValues>,
    named: Vec<(String, RowValues)>,
}

impl Bindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Bindings::insert`].
    #[must_use]
    pub fn bind(mut self, key: impl Into<BindKey>, value: impl Into<RowValues>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<BindKey>, value: impl Into<RowValues>) {
        let value = value.into();
        match key.into() {
            BindKey::Position(index) => {
                self.positional.insert(index, value);
            }
            BindKey::Name(name) => {
                if let Some(slot) = self.named.iter_mut().find(|(n, _)| *n == name) {
                    slot.1 = value;
                } else {
                    self.named.push((name, value));
                }
            }
        }
    }

    /// Overlay `other` on `self`; `other` wins on identical keys.
    #[must_use]
    pub fn merged(mut self, other: Bindings) -> Self {
        for (index, value) in other.positional {
            self.insert(index, value);
        }
        for (name, value) in other.named {
            self.insert(BindKey::Name(name), value);
        }
        self
    }

    /// Positional values in ascending index order.
    pub fn positional(&self) -> impl Iterator<Item = (usize, &RowValues)> {
        self.positional.iter().map(|(i, v)| (*i, v))
    }

    /// Named values in binding order; names carry their `:` prefix.
    pub fn named(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.named.iter().map(|(n, v)| (n.as_str(), v))
    }

    #[must_use]
    pub fn get(&self, key: &BindKey) -> Option<&RowValues> {
        match key {
            BindKey::Position(index) => self.positional.get(index),
            BindKey::Name(name) => self
                .named
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<RowValues>> for Bindings {
    /// Positional bindings numbered from zero.
    fn from(values: Vec<RowValues>) -> Self {
        values.into_iter().enumerate().collect()
    }
}

impl<K: Into<BindKey>, V: Into<RowValues>> FromIterator<(K, V)> for Bindings {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut bindings = Bindings::new();
        for (key, value) in iter {
            bindings.insert(key, value);
        }
        bindings
    }
}

/// Query text plus bindings, waiting to be compiled and run.
#[derive(Debug)]
pub struct Statement<'c> {
    client: &'c Client,
    sql: String,
    bindings: Bindings,
}

impl<'c> Statement<'c> {
    pub(crate) fn new(client: &'c Client, sql: String) -> Self {
        Self {
            client,
            sql,
            bindings: Bindings::new(),
        }
    }

    /// Bind `value` to a position (`usize`) or a name (`&str`/`String`).
    pub fn bind_value(&mut self, key: impl Into<BindKey>, value: impl Into<RowValues>) -> &mut Self {
        self.bindings.insert(key, value);
        self
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Distinct `:name` tokens appearing in the query text.
    #[must_use]
    pub fn named_placeholders(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for token in NAMED_PLACEHOLDER.find_iter(&self.sql).map(|m| m.as_str()) {
            if !seen.contains(&token) {
                seen.push(token);
            }
        }
        seen
    }

    /// Resolve the literal SQL for the current bindings merged with `extra`.
    ///
    /// # Errors
    /// Returns `SqlAnywhereError::QueryError` if the connection is gone and
    /// values cannot be escaped.
    pub fn compile(&self, extra: Bindings) -> Result<CompiledQuery<'c>> {
        let bindings = self.bindings.clone().merged(extra);

        let positional = bindings
            .positional()
            .map(|(_, value)| self.format_value(value, true))
            .collect::<Result<Vec<_>>>()?;
        let named = bindings
            .named()
            .map(|(name, value)| self.format_value(value, false).map(|text| (name, text)))
            .collect::<Result<Vec<_>>>()?;

        for (name, _) in &named {
            if !self.sql.contains(*name) {
                debug!(placeholder = *name, "named binding does not occur in query");
            }
        }
        for token in self.named_placeholders() {
            if bindings.get(&BindKey::Name(token.to_string())).is_none() {
                trace!(placeholder = token, "placeholder left unbound");
            }
        }

        let sql = substitute(&self.sql, &positional, &named);
        trace!(sql = %sql, "compiled statement");
        Ok(CompiledQuery {
            client: self.client,
            sql,
        })
    }

    /// Compile and run.
    ///
    /// # Errors
    /// Returns `SqlAnywhereError::QueryError` (code 110) with the engine
    /// diagnostic if execution fails.
    pub fn execute(&self, extra: Bindings) -> Result<QueryResult<'c>> {
        self.compile(extra)?.execute()
    }

    fn format_value(&self, value: &RowValues, positional: bool) -> Result<String> {
        if positional && value.is_empty() {
            return Ok("NULL".to_string());
        }
        let escaped = self.client.escape(&value.to_bind_text())?;
        Ok(format!("'{escaped}'"))
    }
}

/// Literal SQL produced by [`Statement::compile`].
#[derive(Debug)]
pub struct CompiledQuery<'c> {
    client: &'c Client,
    sql: String,
}

impl<'c> CompiledQuery<'c> {
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn into_sql(self) -> String {
        self.sql
    }

    /// # Errors
    /// Returns `SqlAnywhereError::QueryError` (code 110) with the engine diagnostic.
    pub fn execute(self) -> Result<QueryResult<'c>> {
        self.client.run(&self.sql)
    }
}

/// Replace `?` tokens with `positional` in order, then every named token.
///
/// Surplus `?` tokens stay as they are; surplus values are ignored.
/// Substituted values are never rescanned for `?`.
pub(crate) fn substitute(sql: &str, positional: &[String], named: &[(&str, String)]) -> String {
    let mut segments = sql.split('?');
    let mut out = String::with_capacity(sql.len() + positional.iter().map(String::len).sum::<usize>());
    if let Some(first) = segments.next() {
        out.push_str(first);
    }
    let mut values = positional.iter();
    for segment in segments {
        match values.next() {
            Some(value) => out.push_str(value),
            None => out.push('?'),
        }
        out.push_str(segment);
    }

    for (token, value) in named {
        out = out.replace(token, value);
    }
    out
}
