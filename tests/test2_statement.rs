use std::sync::Arc;

use sql_anywhere::prelude::*;
use sql_anywhere::test_utils::{MockDriver, MockEvent, test_config};

fn connect(driver: &MockDriver) -> Client {
    Connector::new(Arc::new(driver.clone()))
        .connect(&test_config("demo"))
        .unwrap()
}

#[test]
fn positional_bindings_substitute_left_to_right() {
    let driver = MockDriver::new();
    let client = connect(&driver);

    let mut stmt = client.prepare("SELECT * FROM t WHERE a = ? AND b = ?");
    stmt.bind_value(0usize, "a").bind_value(1usize, "b");
    stmt.execute(Bindings::new()).unwrap();

    assert_eq!(
        driver.executed(),
        vec!["SELECT * FROM t WHERE a = 'a' AND b = 'b'".to_string()]
    );
}

#[test]
fn positional_order_follows_index_not_bind_order() {
    let driver = MockDriver::new();
    let client = connect(&driver);

    let compiled = client
        .prepare("VALUES (?, ?)")
        .bind_value(1usize, "second")
        .bind_value(0usize, "first")
        .compile(Bindings::new())
        .unwrap()
        .into_sql();
    assert_eq!(compiled, "VALUES ('first', 'second')");
    // compiling never reaches the engine
    assert!(driver.executed().is_empty());
}

#[test]
fn empty_positional_values_become_null() {
    let driver = MockDriver::new();
    let client = connect(&driver);

    let compiled = client
        .prepare("INSERT INTO t VALUES (?, ?, ?, ?, ?)")
        .compile(Bindings::from(vec![
            RowValues::Text(String::new()),
            RowValues::Null,
            RowValues::Int(0),
            RowValues::Bool(false),
            RowValues::Int(7),
        ]))
        .unwrap();
    assert_eq!(compiled.sql(), "INSERT INTO t VALUES (NULL, NULL, NULL, NULL, '7')");
    assert!(!compiled.sql().contains("''"));
}

#[test]
fn named_values_are_always_quoted() {
    let driver = MockDriver::new();
    let client = connect(&driver);

    let compiled = client
        .prepare("UPDATE t SET a = :a, b = :b")
        .bind_value("a", RowValues::Null)
        .bind_value(":b", 0)
        .compile(Bindings::new())
        .unwrap();
    assert_eq!(compiled.sql(), "UPDATE t SET a = '', b = '0'");
}

#[test]
fn values_are_escaped_by_the_connection() {
    let driver = MockDriver::new();
    let client = connect(&driver);

    let compiled = client
        .prepare("SELECT * FROM t WHERE name = ? OR note = :note")
        .bind_value(0usize, "O'Brien")
        .bind_value("note", "say \"hi\"\n")
        .compile(Bindings::new())
        .unwrap();
    assert_eq!(
        compiled.sql(),
        r#"SELECT * FROM t WHERE name = 'O\'Brien' OR note = 'say \"hi\"\n'"#
    );
}

#[test]
fn named_and_positional_substitute_independently() {
    let driver = MockDriver::new();
    let client = connect(&driver);

    let compiled = client
        .prepare("SELECT * FROM t WHERE a = ? AND id = :id AND b = ?")
        .bind_value("id", 5)
        .bind_value(0usize, "x")
        .bind_value(1usize, "y")
        .compile(Bindings::new())
        .unwrap();
    assert_eq!(compiled.sql(), "SELECT * FROM t WHERE a = 'x' AND id = '5' AND b = 'y'");
}

#[test]
fn named_replacement_also_hits_longer_identifiers() {
    let driver = MockDriver::new();
    let client = connect(&driver);

    // `:id` is a prefix of `:idx`; the text replacement rewrites both.
    let compiled = client
        .prepare("SELECT * FROM t WHERE a = ? AND id = :id AND x = :idx")
        .bind_value("id", 5)
        .bind_value(0usize, "p")
        .compile(Bindings::new())
        .unwrap();
    assert_eq!(
        compiled.sql(),
        "SELECT * FROM t WHERE a = 'p' AND id = '5' AND x = '5'x"
    );
}

#[test]
fn execution_bindings_win_and_stored_ones_survive() {
    let driver = MockDriver::new();
    let client = connect(&driver);

    let mut stmt = client.prepare("SELECT ?, :name");
    stmt.bind_value(0usize, "stored").bind_value("name", "bob");

    stmt.execute(Bindings::new().bind(0usize, "override")).unwrap();
    stmt.execute(Bindings::new()).unwrap();
    stmt.execute(Bindings::new().bind(":name", "alice")).unwrap();

    assert_eq!(
        driver.executed(),
        vec![
            "SELECT 'override', 'bob'".to_string(),
            "SELECT 'stored', 'bob'".to_string(),
            "SELECT 'stored', 'alice'".to_string(),
        ]
    );
    assert_eq!(stmt.bindings().len(), 2);
}

#[test]
fn later_binds_overwrite_earlier_ones() {
    let driver = MockDriver::new();
    let client = connect(&driver);

    let compiled = client
        .prepare("SELECT ?, :n")
        .bind_value(0usize, "first")
        .bind_value("n", 1)
        .bind_value(0usize, "second")
        .bind_value(":n", 2)
        .compile(Bindings::new())
        .unwrap();
    assert_eq!(compiled.sql(), "SELECT 'second', '2'");
}

#[test]
fn named_placeholders_are_listed_once() {
    let driver = MockDriver::new();
    let client = connect(&driver);
    let stmt = client.prepare("SELECT :a, :b, :a FROM t WHERE c = ?");
    assert_eq!(stmt.named_placeholders(), vec![":a", ":b"]);
}

#[test]
fn prepare_performs_no_native_call() {
    let driver = MockDriver::new();
    let client = connect(&driver);
    let before = driver.events().len();
    let _stmt = client.prepare("SELECT 1");
    assert_eq!(driver.events().len(), before);
}

#[test]
fn execution_failure_is_a_query_error_with_native_diagnostic() {
    let driver = MockDriver::new();
    let client = connect(&driver);
    driver.push_failure(-141, "Table 'missing' not found");

    let err = client
        .prepare("SELECT * FROM missing WHERE id = ?")
        .bind_value(0usize, 1)
        .execute(Bindings::new())
        .unwrap_err();
    assert_eq!(err.code(), sql_anywhere::ERR_QUERY);
    assert_eq!(err.native_code(), Some(-141));
    assert_eq!(err.to_string(), "SQL-query problem: Table 'missing' not found");
    assert_eq!(client.error_code(), -141);
    assert_eq!(client.error_info(), "Table 'missing' not found");

    // the connection stays usable for the next statement
    client.query("SELECT 1").unwrap();
    assert_eq!(client.error_code(), 0);
    assert!(matches!(driver.events().last(), Some(MockEvent::Query(sql)) if sql == "SELECT 1"));
}
