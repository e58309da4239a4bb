use simple_sql_middleware::prelude::*;
use simple_sql_middleware::test_utils::ScriptedDriver;

fn connect(driver: &ScriptedDriver) -> Connection<ScriptedDriver> {
    Connection::new(ConnectionConfig::new("localhost", "app", "shop"), driver.clone()).unwrap()
}

fn last_sql(driver: &ScriptedDriver) -> String {
    driver.executed().last().cloned().unwrap_or_default()
}

#[test]
fn insert_lists_columns_and_values() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);
    driver.push_done(12, 1);

    let data = Conditions::new()
        .with("name", "Ada")
        .with("age", 36)
        .with("created", "NOW()")
        .with("note", SqlValue::Null);
    let result = conn.insert("users", &data)?;

    assert_eq!(result.insert_id(), Some(12));
    assert_eq!(
        last_sql(&driver),
        "INSERT INTO `users` (`name`,`age`,`created`,`note`) VALUES ('Ada',36,NOW(),NULL);"
    );
    Ok(())
}

#[test]
fn replace_and_database_qualifier() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);
    driver.push_done(3, 1);

    let data = Conditions::new().with("id", 3).with("name", "x");
    let result = conn.replace(Table::new("users").in_database("archive"), &data)?;

    assert_eq!(result.insert_id(), Some(3));
    assert_eq!(
        last_sql(&driver),
        "REPLACE INTO `archive`.`users` (`id`,`name`) VALUES (3,'x');"
    );
    Ok(())
}

#[test]
fn empty_data_never_reaches_the_driver() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);

    let result = conn.insert("users", &Conditions::new())?;
    assert!(result.is_failure());
    let result = conn.update("users", &Conditions::new(), "id = 1")?;
    assert!(result.is_failure());
    let result = conn.select("   ", WhereClause::default())?;
    assert_eq!(result.failure(), Some("invalid table name"));

    assert!(driver.executed().is_empty());
    assert_eq!(conn.errors().len(), 3);
    assert_eq!(conn.errors()[0], "empty data for INSERT");
    Ok(())
}

#[test]
fn update_renders_set_list_and_where_map() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);
    driver.push_done(0, 2);

    let data = Conditions::new().with("name", "Bob").with("visits", 4);
    let filter = Conditions::new().with("id IN", vec![1, 2]);
    let result = conn.update("users", &data, filter)?;

    assert_eq!(result.affected_rows(), Some(2));
    assert_eq!(
        last_sql(&driver),
        "UPDATE `users` SET `name` = 'Bob'\n, `visits` = 4 WHERE (`id` IN (1,2));"
    );
    Ok(())
}

#[test]
fn raw_where_is_used_verbatim() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);
    driver.push_done(0, 5);

    let result = conn.delete("sessions", "expires < NOW()")?;

    assert_eq!(result.affected_rows(), Some(5));
    assert_eq!(
        last_sql(&driver),
        "DELETE FROM `sessions` WHERE (expires < NOW());"
    );
    Ok(())
}

#[test]
fn select_with_or_group_and_between() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);
    driver.push_rows(&[("id", field_type::LONG)], vec![]);

    let filter = Conditions::new()
        .with("age >=", 18)
        .with("name LIKE OR", "A%")
        .with("score BETWEEN", vec![10, 20]);
    let result = conn.select("users", filter)?;

    assert!(result.into_cursor().is_some());
    assert_eq!(
        last_sql(&driver),
        "SELECT * FROM `users` WHERE (`age` >= 18\nAND ( `name` LIKE 'A%' )\nAND `score` BETWEEN (10 AND 20));"
    );
    Ok(())
}

#[test]
fn select_all_uses_tautology() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    let mut conn = connect(&driver);
    driver.push_rows(&[("id", field_type::LONG)], vec![]);

    conn.select_all("users")?;
    assert_eq!(last_sql(&driver), "SELECT * FROM `users` WHERE (1=1);");
    Ok(())
}
