use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use crate::error::{Result, SqlAnywhereError};

/// Keys that must be present before a DSN can be built, in reporting order.
pub const REQUIRED_KEYS: [&str; 5] = ["host", "port", "database", "username", "password"];

/// Connection settings as handed over by the application.
///
/// Required keys are optional at the type level so that every missing one
/// can be reported at once. Scalars may be given as strings or numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Name the connection is registered under by the caller.
    #[serde(deserialize_with = "scalar_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub host: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub port: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub database: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub username: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub password: Option<String>,
    /// Engine (server) name, rendered as `eng=`.
    #[serde(deserialize_with = "scalar_string")]
    pub server: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub charset: Option<String>,
    /// Table prefix used by the query-building layer; carried, never used here.
    #[serde(deserialize_with = "scalar_string")]
    pub prefix: Option<String>,
    #[serde(deserialize_with = "loose_bool")]
    pub autocommit: Option<bool>,
    #[serde(deserialize_with = "loose_bool")]
    pub persistent: Option<bool>,
}

impl ConnectionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of connection settings.
    ///
    /// # Errors
    /// Returns `SqlAnywhereError::JsonError` if the text is not a valid settings object.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build from string key/value pairs. Unknown keys are ignored.
    ///
    /// # Errors
    /// Returns `SqlAnywhereError::ConfigError` if `autocommit` or `persistent`
    /// is not a recognisable boolean.
    pub fn from_pairs<K, V, I>(pairs: I) -> Result<Self>
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut config = Self::default();
        for (key, value) in pairs {
            let value = value.into();
            match key.as_ref() {
                "name" => config.name = Some(value),
                "host" => config.host = Some(value),
                "port" => config.port = Some(value),
                "database" => config.database = Some(value),
                "username" => config.username = Some(value),
                "password" => config.password = Some(value),
                "server" => config.server = Some(value),
                "charset" => config.charset = Some(value),
                "prefix" => config.prefix = Some(value),
                "autocommit" => config.autocommit = Some(parse_bool("autocommit", &value)?),
                "persistent" => config.persistent = Some(parse_bool("persistent", &value)?),
                _ => {}
            }
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: impl ToString) -> Self {
        self.port = Some(port.to_string());
        self
    }

    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn with_autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = Some(autocommit);
        self
    }

    #[must_use]
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = Some(persistent);
        self
    }

    /// Required keys absent from this config, in [`REQUIRED_KEYS`] order.
    #[must_use]
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let present = [
            self.host.is_some(),
            self.port.is_some(),
            self.database.is_some(),
            self.username.is_some(),
            self.password.is_some(),
        ];
        REQUIRED_KEYS
            .iter()
            .zip(present)
            .filter(|(_, present)| !present)
            .map(|(key, _)| *key)
            .collect()
    }

    /// Option overrides carried by this config.
    #[must_use]
    pub fn overrides(&self) -> OptionOverrides {
        OptionOverrides {
            autocommit: self.autocommit,
            persistent: self.persistent,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" | "" => Ok(false),
        other => Err(SqlAnywhereError::ConfigError(format!(
            "invalid boolean for \"{key}\": \"{other}\""
        ))),
    }
}

fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<JsonValue>::deserialize(deserializer)? {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s)),
        Some(JsonValue::Number(n)) => Ok(Some(n.to_string())),
        Some(JsonValue::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number, found {other}"
        ))),
    }
}

fn loose_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<JsonValue>::deserialize(deserializer)? {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Bool(b)) => Ok(Some(b)),
        Some(JsonValue::Number(n)) => Ok(Some(n.as_i64() != Some(0))),
        Some(JsonValue::String(s)) => parse_bool("option", &s).map(Some).map_err(D::Error::custom),
        Some(other) => Err(D::Error::custom(format!("expected a boolean, found {other}"))),
    }
}

/// Engine behaviour flags applied when a [`crate::Client`] is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub autocommit: bool,
    pub persistent: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            autocommit: true,
            persistent: false,
        }
    }
}

impl ConnectionOptions {
    /// Apply caller overrides; an override always wins over `self`.
    #[must_use]
    pub fn merged(self, overrides: OptionOverrides) -> Self {
        Self {
            autocommit: overrides.autocommit.unwrap_or(self.autocommit),
            persistent: overrides.persistent.unwrap_or(self.persistent),
        }
    }
}

/// Caller-supplied option values; `None` leaves the default in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptionOverrides {
    pub autocommit: Option<bool>,
    pub persistent: Option<bool>,
}

/// Connection string handed to the engine: ordered `key=value` pairs joined by `;`.
#[derive(Clone, PartialEq, Eq)]
pub struct Dsn {
    pairs: Vec<(String, String)>,
}

impl Dsn {
    /// Build the DSN for `config`.
    ///
    /// Pairs are always `commlinks, uid, pwd, dbn`, then `eng` when a server
    /// is set, then `charset` when a charset is set.
    ///
    /// # Errors
    /// Returns `SqlAnywhereError::ConfigError` naming every missing required key.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self> {
        let (Some(host), Some(port), Some(database), Some(username), Some(password)) = (
            &config.host,
            &config.port,
            &config.database,
            &config.username,
            &config.password,
        ) else {
            return Err(SqlAnywhereError::ConfigError(format!(
                "Failed to compile data source name due to missing configuration parameters: \"{}\"",
                config.missing_keys().join(", ")
            )));
        };

        let mut pairs = vec![
            ("commlinks".to_string(), format!("tcpip{{host={host}:{port}}}")),
            ("uid".to_string(), username.clone()),
            ("pwd".to_string(), password.clone()),
            ("dbn".to_string(), database.clone()),
        ];
        if let Some(server) = &config.server {
            pairs.push(("eng".to_string(), server.clone()));
        }
        if let Some(charset) = &config.charset {
            pairs.push(("charset".to_string(), charset.clone()));
        }
        Ok(Self { pairs })
    }

    /// Build from explicit pairs, kept in the given order.
    #[must_use]
    pub fn from_pairs<K: Into<String>, V: Into<String>>(
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Same rendering as `Display`, with the password masked.
    #[must_use]
    pub fn redacted(&self) -> String {
        self.render(true)
    }

    fn render(&self, redact: bool) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| {
                if redact && k == "pwd" {
                    format!("{k}=***")
                } else {
                    format!("{k}={v}")
                }
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl fmt::Display for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

impl fmt::Debug for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dsn").field(&self.redacted()).finish()
    }
}
