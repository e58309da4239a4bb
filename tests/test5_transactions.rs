use simple_sql_middleware::prelude::*;
use simple_sql_middleware::test_utils::ScriptedDriver;

fn connect(driver: &ScriptedDriver) -> Connection<ScriptedDriver> {
    Connection::new(ConnectionConfig::new("localhost", "app", "shop"), driver.clone()).unwrap()
}

#[test]
fn clean_transaction_commits() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);

    assert!(conn.begin_transaction());
    assert_eq!(conn.state(), LinkState::InTransaction);
    conn.query("INSERT INTO t (a) VALUES (1)", &[])?;

    assert!(conn.end_transaction());
    assert_eq!(driver.commits(), 1);
    assert_eq!(driver.rollbacks(), 0);
    assert_eq!(driver.autocommit_calls(), vec![false, true]);
    assert_eq!(conn.state(), LinkState::Connected);
    Ok(())
}

#[test]
fn statement_error_turns_commit_into_rollback() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);

    assert!(conn.begin_transaction());
    driver.push_done(1, 1).push_error("Duplicate entry '1' for key 'PRIMARY'");
    conn.query("INSERT INTO t (id) VALUES (1)", &[])?;
    assert!(conn.query("INSERT INTO t (id) VALUES (1)", &[])?.is_failure());

    assert!(!conn.end_transaction());
    assert_eq!(driver.rollbacks(), 1);
    assert_eq!(driver.commits(), 0);
    assert!(!conn.in_transaction());
    Ok(())
}

#[test]
fn nested_begin_is_refused() {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);

    assert!(conn.begin_transaction());
    assert!(!conn.begin_transaction());
    assert!(conn.in_transaction());
    assert_eq!(conn.errors().len(), 1);
    assert_eq!(driver.autocommit_calls(), vec![false]);

    // the refused begin left an error behind
    assert!(!conn.end_transaction());
    assert_eq!(driver.rollbacks(), 1);
}

#[test]
fn begin_clears_earlier_errors() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);
    driver.push_error("Table 'shop.nope' doesn't exist");
    conn.query("SELECT * FROM nope", &[])?;
    assert_eq!(conn.errors().len(), 1);

    assert!(conn.begin_transaction());
    assert!(conn.errors().is_empty());
    assert!(conn.end_transaction());
    Ok(())
}

#[test]
fn begin_without_link_fails() {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);
    conn.close();

    assert!(!conn.begin_transaction());
    assert!(!conn.in_transaction());
    assert_eq!(conn.last_error(), Some("Error: not connected"));
    assert!(driver.autocommit_calls().is_empty());
}

#[test]
fn explicit_rollback_restores_autocommit() {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);

    assert!(!conn.rollback());
    assert_eq!(driver.rollbacks(), 0);

    assert!(conn.begin_transaction());
    assert!(conn.rollback());
    assert_eq!(driver.rollbacks(), 1);
    assert_eq!(driver.autocommit_calls(), vec![false, true]);
    assert_eq!(conn.state(), LinkState::Connected);
}

#[test]
fn end_without_begin_is_refused() {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);

    assert!(!conn.end_transaction());
    assert_eq!(driver.commits(), 0);
    assert_eq!(driver.rollbacks(), 0);
    assert!(driver.autocommit_calls().is_empty());
    assert_eq!(conn.last_error(), Some("Error: no transaction to end"));
    assert_eq!(conn.state(), LinkState::Connected);
}
