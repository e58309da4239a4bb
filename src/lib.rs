//! Blocking SQL client layer over a pluggable wire driver.
//!
//! Values are escaped into SQL literals, condition maps become `WHERE`/`SET` clauses,
//! statements run through a reconnect-aware [`Connection`], and result sets come back as
//! typed [`Cursor`]s.
//!
//! ```rust,no_run
//! use simple_sql_middleware::prelude::*;
//!
//! # fn main() -> Result<(), SqlClientError> {
//! let mut conn = simple_sql_middleware::sqlite::open(":memory:")?;
//! conn.query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER)", &[])?;
//! conn.insert("users", &Conditions::new().with("name", "Ada").with("age", 36))?;
//!
//! let filter = Conditions::new().with("age >=", 18).with("name LIKE OR", "A%");
//! if let QueryResult::Rows(mut cursor) = conn.select("users", filter)? {
//!     for row in cursor.fetch_all_records() {
//!         println!("{:?}", row.get("name"));
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod prelude;

pub mod cache;
pub mod conditions;
pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod escape;
pub mod placeholders;
pub mod registry;
pub mod results;
pub mod test_utils;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use cache::{MemoryCache, QueryCache};
pub use conditions::{Condition, Conditions, Glue, Operator};
pub use config::{ConnectionConfig, ConnectionConfigBuilder};
pub use connection::{Connection, LinkState, Table, WhereClause};
pub use driver::{Driver, DriverOutcome, DriverRows, FieldMeta};
pub use error::SqlClientError;
pub use escape::{ArrayMode, EscapeOptions, Escaped, ValueEscaper};
pub use registry::ConnectionRegistry;
pub use results::{BatchOutcome, Cursor, Executed, FetchedRow, OrderedRow, QueryResult, Row};
pub use types::{FetchShape, SqlValue};
