//! `rusqlite`-backed [`Driver`](crate::driver::Driver).

mod driver;
mod rows;

pub use driver::SqliteDriver;
pub use rows::SqliteRows;

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::error::SqlClientError;

/// Open a `Connection` over SQLite at `path` (`:memory:` for an in-memory database).
///
/// # Errors
/// Returns `SqlClientError::ConnectionError` if the database cannot be opened.
pub fn open(path: &str) -> Result<Connection<SqliteDriver>, SqlClientError> {
    let config = ConnectionConfig::builder("localhost", "sqlite", path).finish();
    Connection::new(config, SqliteDriver::new())
}
