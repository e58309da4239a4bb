use crate::conditions::{self, Conditions, Glue};
use crate::driver::Driver;
use crate::error::SqlClientError;
use crate::results::QueryResult;

use super::core::Connection;

/// Table name with an optional database qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub database: Option<String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            database: None,
        }
    }

    #[must_use]
    pub fn in_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}

impl From<&str> for Table {
    fn from(name: &str) -> Self {
        Table::new(name)
    }
}

impl From<String> for Table {
    fn from(name: String) -> Self {
        Table::new(name)
    }
}

/// `WHERE` body of a builder statement.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereClause {
    /// Condition map joined with `AND`.
    Conditions(Conditions),
    /// Trusted SQL, inserted verbatim.
    Raw(String),
}

impl Default for WhereClause {
    fn default() -> Self {
        WhereClause::Raw("1=1".to_string())
    }
}

impl From<Conditions> for WhereClause {
    fn from(conditions: Conditions) -> Self {
        WhereClause::Conditions(conditions)
    }
}

impl From<&str> for WhereClause {
    fn from(sql: &str) -> Self {
        WhereClause::Raw(sql.to_string())
    }
}

impl From<String> for WhereClause {
    fn from(sql: String) -> Self {
        WhereClause::Raw(sql)
    }
}

impl<D: Driver> Connection<D> {
    /// `INSERT INTO t (cols) VALUES (vals);`, returning the insert id.
    ///
    /// # Errors
    /// Propagates escaping and `query` errors.
    pub fn insert(
        &mut self,
        table: impl Into<Table>,
        data: &Conditions,
    ) -> Result<QueryResult, SqlClientError> {
        self.write_row("INSERT", &table.into(), data)
    }

    /// `REPLACE INTO t (cols) VALUES (vals);`, returning the insert id.
    ///
    /// # Errors
    /// Propagates escaping and `query` errors.
    pub fn replace(
        &mut self,
        table: impl Into<Table>,
        data: &Conditions,
    ) -> Result<QueryResult, SqlClientError> {
        self.write_row("REPLACE", &table.into(), data)
    }

    fn write_row(
        &mut self,
        verb: &str,
        table: &Table,
        data: &Conditions,
    ) -> Result<QueryResult, SqlClientError> {
        if let Some(failure) = self.reject_empty(table, Some(data), verb) {
            return Ok(failure);
        }

        let escaper = self.escaper();
        let columns = data
            .iter()
            .map(|c| escaper.quote_identifier(&c.column))
            .collect::<Result<Vec<_>, _>>()?
            .join(",");
        let values = data
            .iter()
            .map(|c| escaper.secure(&c.value))
            .collect::<Result<Vec<_>, _>>()?
            .join(",");
        let sql = format!(
            "{verb} INTO {} ({columns}) VALUES ({values});",
            self.qualified(table)?
        );
        self.query(&sql, &[])
    }

    /// `UPDATE t SET … WHERE (…);`, returning the affected row count.
    ///
    /// # Errors
    /// Propagates escaping and `query` errors.
    pub fn update(
        &mut self,
        table: impl Into<Table>,
        data: &Conditions,
        filter: impl Into<WhereClause>,
    ) -> Result<QueryResult, SqlClientError> {
        let table = table.into();
        if let Some(failure) = self.reject_empty(&table, Some(data), "UPDATE") {
            return Ok(failure);
        }

        let set = conditions::render(data, Glue::Comma, &self.escaper())?;
        let filter = self.render_where(&filter.into())?;
        let sql = format!(
            "UPDATE {} SET {set} WHERE ({filter});",
            self.qualified(&table)?
        );
        self.query(&sql, &[])
    }

    /// `DELETE FROM t WHERE (…);`, returning the affected row count.
    ///
    /// # Errors
    /// Propagates escaping and `query` errors.
    pub fn delete(
        &mut self,
        table: impl Into<Table>,
        filter: impl Into<WhereClause>,
    ) -> Result<QueryResult, SqlClientError> {
        let table = table.into();
        if let Some(failure) = self.reject_empty(&table, None, "DELETE") {
            return Ok(failure);
        }

        let filter = self.render_where(&filter.into())?;
        let sql = format!("DELETE FROM {} WHERE ({filter});", self.qualified(&table)?);
        self.query(&sql, &[])
    }

    pub(crate) fn reject_empty(
        &mut self,
        table: &Table,
        data: Option<&Conditions>,
        verb: &str,
    ) -> Option<QueryResult> {
        let message = if table.name.trim().is_empty() {
            "invalid table name".to_string()
        } else if data.is_some_and(Conditions::is_empty) {
            format!("empty data for {verb}")
        } else {
            return None;
        };
        self.record_error(message.clone());
        Some(QueryResult::Failure(message))
    }

    pub(crate) fn render_where(&self, filter: &WhereClause) -> Result<String, SqlClientError> {
        match filter {
            WhereClause::Conditions(map) => conditions::render(map, Glue::And, &self.escaper()),
            WhereClause::Raw(sql) => Ok(sql.clone()),
        }
    }

    pub(crate) fn qualified(&self, table: &Table) -> Result<String, SqlClientError> {
        let escaper = self.escaper();
        let name = escaper.quote_identifier(table.name.trim())?;
        match table.database.as_deref().map(str::trim) {
            Some(db) if !db.is_empty() => Ok(format!("{}.{name}", escaper.quote_identifier(db)?)),
            _ => Ok(name),
        }
    }
}
