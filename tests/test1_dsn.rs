use std::sync::Arc;

use sql_anywhere::config::REQUIRED_KEYS;
use sql_anywhere::prelude::*;
use sql_anywhere::test_utils::MockDriver;

fn full() -> ConnectionConfig {
    ConnectionConfig::new()
        .with_host("h")
        .with_port("p")
        .with_database("d")
        .with_username("u")
        .with_password("pw")
}

fn without(keys: &[&str]) -> ConnectionConfig {
    let mut config = full();
    for key in keys {
        match *key {
            "host" => config.host = None,
            "port" => config.port = None,
            "database" => config.database = None,
            "username" => config.username = None,
            "password" => config.password = None,
            other => panic!("unexpected key {other}"),
        }
    }
    config
}

fn connector() -> Connector {
    Connector::new(Arc::new(MockDriver::new()))
}

#[test]
fn minimal_config_renders_fixed_order() {
    let dsn = connector().get_dsn(&full()).unwrap();
    assert_eq!(dsn.to_string(), "commlinks=tcpip{host=h:p};uid=u;pwd=pw;dbn=d");
}

#[test]
fn server_then_charset_are_appended_in_order() {
    let with_server = full().with_server("S");
    assert_eq!(
        connector().get_dsn(&with_server).unwrap().to_string(),
        "commlinks=tcpip{host=h:p};uid=u;pwd=pw;dbn=d;eng=S"
    );

    // builder order must not matter, only the fixed rendering order
    let both = full().with_charset("C").with_server("S");
    assert_eq!(
        connector().get_dsn(&both).unwrap().to_string(),
        "commlinks=tcpip{host=h:p};uid=u;pwd=pw;dbn=d;eng=S;charset=C"
    );

    let charset_only = full().with_charset("C");
    assert_eq!(
        connector().get_dsn(&charset_only).unwrap().to_string(),
        "commlinks=tcpip{host=h:p};uid=u;pwd=pw;dbn=d;charset=C"
    );
}

#[test]
fn every_missing_subset_is_reported_in_fixed_order() {
    for mask in 1u32..(1 << REQUIRED_KEYS.len()) {
        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, k)| *k)
            .collect();
        let err = connector().get_dsn(&without(&missing)).unwrap_err();
        assert!(matches!(err, SqlAnywhereError::ConfigError(_)));
        let expected = format!("\"{}\"", missing.join(", "));
        assert!(
            err.to_string().ends_with(&expected),
            "{err} should end with {expected}"
        );
    }
}

#[test]
fn missing_keys_fail_before_any_connection_attempt() {
    let driver = MockDriver::new();
    let connector = Connector::new(Arc::new(driver.clone()));
    let err = connector.connect(&without(&["port", "password"])).unwrap_err();
    assert_eq!(err.code(), 0);
    assert!(err.to_string().ends_with("\"port, password\""));
    assert!(driver.events().is_empty());
}

#[test]
fn json_config_with_numeric_port() {
    let config = ConnectionConfig::from_json_str(
        r#"{"name":"legacy","host":"10.0.0.5","port":2638,"database":"demo","username":"dba","password":"sql","server":"demo16"}"#,
    )
    .unwrap();
    assert_eq!(
        connector().get_dsn(&config).unwrap().to_string(),
        "commlinks=tcpip{host=10.0.0.5:2638};uid=dba;pwd=sql;dbn=demo;eng=demo16"
    );
}

#[test]
fn string_pairs_config() {
    let config = ConnectionConfig::from_pairs([
        ("host", "h"),
        ("port", "p"),
        ("database", "d"),
        ("username", "u"),
        ("password", "pw"),
        ("charset", "utf8"),
        ("prefix", "app_"),
        ("persistent", "true"),
        ("unknown", "ignored"),
    ])
    .unwrap();
    assert_eq!(config.prefix.as_deref(), Some("app_"));
    assert_eq!(
        connector().get_dsn(&config).unwrap().to_string(),
        "commlinks=tcpip{host=h:p};uid=u;pwd=pw;dbn=d;charset=utf8"
    );
    assert!(connector().options(&config).persistent);
}

#[test]
fn connector_defaults_and_overrides() {
    let connector = connector();
    assert_eq!(connector.options(&full()), ConnectionOptions::default());

    let merged = connector.options(&full().with_autocommit(false));
    assert!(!merged.autocommit);
    assert!(!merged.persistent);

    let connector = connector.with_defaults(ConnectionOptions {
        autocommit: false,
        persistent: true,
    });
    let merged = connector.options(&full().with_autocommit(true));
    assert!(merged.autocommit);
    assert!(merged.persistent);
}
