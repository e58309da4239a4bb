use simple_sql_middleware::prelude::*;
use simple_sql_middleware::test_utils::{GONE_AWAY, ScriptedDriver};

fn connect(driver: &ScriptedDriver) -> Connection<ScriptedDriver> {
    Connection::new(ConnectionConfig::new("localhost", "app", "shop"), driver.clone()).unwrap()
}

#[test]
fn gives_up_after_the_reconnect_budget() {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);
    for _ in 0..4 {
        driver.push_error(GONE_AWAY);
    }

    let err = conn.query("SELECT 1", &[]).unwrap_err();

    let SqlClientError::LinkLost { attempts, message } = err else {
        panic!("expected LinkLost");
    };
    assert_eq!(attempts, 3);
    assert_eq!(message, GONE_AWAY);
    // one initial execute plus one per reconnect
    assert_eq!(driver.executed().len(), 4);
    assert_eq!(driver.pings(), 3);
    assert_eq!(driver.connects(), 4);
    assert_eq!(conn.query_count(), 4);
    assert!(!conn.is_ready());
    assert_eq!(conn.errors().len(), 1);
}

#[test]
fn recovers_when_the_link_comes_back() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);
    driver.push_error(GONE_AWAY).push_done(7, 1);

    let result = conn.query("INSERT INTO t (a) VALUES (1)", &[])?;

    assert_eq!(result.insert_id(), Some(7));
    assert_eq!(driver.executed().len(), 2);
    assert_eq!(driver.connects(), 2);
    assert!(conn.errors().is_empty());
    assert!(conn.is_ready());
    Ok(())
}

#[test]
fn live_ping_skips_the_handshake() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);
    driver.queue_pings(&[true]);
    driver.push_error(GONE_AWAY).push_done(0, 0);

    conn.query("SET @a = 1", &[])?;

    assert_eq!(driver.pings(), 1);
    assert_eq!(driver.connects(), 1);
    assert_eq!(driver.closes(), 0);
    Ok(())
}

#[test]
fn budget_resets_after_each_answered_statement() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);

    for _ in 0..2 {
        for _ in 0..3 {
            driver.push_error(GONE_AWAY);
        }
        driver.push_done(0, 0);
        assert!(matches!(conn.query("DO 1", &[])?, QueryResult::Ack));
    }

    assert_eq!(driver.executed().len(), 8);
    assert_eq!(driver.connects(), 7);
    Ok(())
}

#[test]
fn custom_budget_is_honoured() {
    let driver = ScriptedDriver::new();
    let mut conn = ConnectionConfig::builder("localhost", "app", "shop")
        .max_reconnect_attempts(1)
        .connect(driver.clone())
        .unwrap();
    driver.push_error(GONE_AWAY).push_error(GONE_AWAY);

    let err = conn.query("SELECT 1", &[]).unwrap_err();

    assert!(matches!(err, SqlClientError::LinkLost { attempts: 1, .. }));
    assert_eq!(driver.executed().len(), 2);
}

#[test]
fn failed_reconnect_still_counts_against_the_budget() {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);
    driver.queue_connects(&[false, false, false]);
    for _ in 0..4 {
        driver.push_error(GONE_AWAY);
    }

    let err = conn.query("SELECT 1", &[]).unwrap_err();

    assert!(matches!(err, SqlClientError::LinkLost { attempts: 3, .. }));
    assert_eq!(driver.executed().len(), 4);
}

#[test]
fn reconnect_inside_a_transaction_forces_rollback() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);
    assert!(conn.begin_transaction());
    driver.push_error(GONE_AWAY).push_done(1, 1);

    conn.query("INSERT INTO t (a) VALUES (1)", &[])?;

    assert!(conn.in_transaction());
    assert_eq!(conn.last_error(), Some("transaction aborted by reconnect"));
    assert_eq!(driver.autocommit_calls(), vec![false, false]);

    assert!(!conn.end_transaction());
    assert_eq!(driver.rollbacks(), 1);
    assert_eq!(driver.commits(), 0);
    Ok(())
}
