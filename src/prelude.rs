//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::cache::{MemoryCache, QueryCache};
pub use crate::conditions::{Condition, Conditions, Glue, Operator};
pub use crate::config::{ConnectionConfig, ConnectionConfigBuilder};
pub use crate::connection::{Connection, LinkState, Table, WhereClause};
pub use crate::driver::{Driver, DriverOutcome, DriverRows, FieldMeta, field_type};
pub use crate::error::SqlClientError;
pub use crate::escape::{ArrayMode, EscapeOptions, Escaped};
pub use crate::registry::ConnectionRegistry;
pub use crate::results::{
    BatchOutcome, Cursor, Executed, FetchedRow, OrderedRow, QueryResult, ResultSetId, Row,
};
pub use crate::types::{FetchShape, SqlValue};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteDriver;
