use crate::driver::Driver;
use crate::error::SqlClientError;
use crate::results::QueryResult;

use super::core::Connection;
use super::dml::{Table, WhereClause};

impl<D: Driver> Connection<D> {
    /// `SELECT * FROM t WHERE (…);`
    ///
    /// # Errors
    /// Propagates escaping and `query` errors.
    pub fn select(
        &mut self,
        table: impl Into<Table>,
        filter: impl Into<WhereClause>,
    ) -> Result<QueryResult, SqlClientError> {
        let table = table.into();
        if let Some(failure) = self.reject_empty(&table, None, "SELECT") {
            return Ok(failure);
        }

        let filter = self.render_where(&filter.into())?;
        let sql = format!("SELECT * FROM {} WHERE ({filter});", self.qualified(&table)?);
        self.query(&sql, &[])
    }

    /// `SELECT * FROM t WHERE (1=1);`
    ///
    /// # Errors
    /// Propagates escaping and `query` errors.
    pub fn select_all(&mut self, table: impl Into<Table>) -> Result<QueryResult, SqlClientError> {
        self.select(table, WhereClause::default())
    }
}
