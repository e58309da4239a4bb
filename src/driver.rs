//! The boundary to the raw wire driver.
//!
//! The engine never talks to a socket itself. Everything it needs from the server goes
//! through [`Driver`], and every buffered result set through [`DriverRows`].

use crate::config::ConnectionConfig;
use crate::types::{ColumnKind, SqlValue};

/// MySQL-compatible column type codes reported by [`DriverRows::fields`].
pub mod field_type {
    pub const DECIMAL: u16 = 0;
    pub const TINY: u16 = 1;
    pub const SHORT: u16 = 2;
    pub const LONG: u16 = 3;
    pub const FLOAT: u16 = 4;
    pub const DOUBLE: u16 = 5;
    pub const NULL: u16 = 6;
    pub const TIMESTAMP: u16 = 7;
    pub const LONGLONG: u16 = 8;
    pub const INT24: u16 = 9;
    pub const DATE: u16 = 10;
    pub const DATETIME: u16 = 12;
    pub const NEWDECIMAL: u16 = 246;
    pub const BLOB: u16 = 252;
    pub const VAR_STRING: u16 = 253;
    pub const STRING: u16 = 254;
}

/// Name and native type code of one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    pub name: String,
    pub type_code: u16,
}

impl FieldMeta {
    pub fn new(name: impl Into<String>, type_code: u16) -> Self {
        Self {
            name: name.into(),
            type_code,
        }
    }

    /// Scalar kind fetched cells of this column are cast to.
    #[must_use]
    pub fn kind(&self) -> ColumnKind {
        match self.type_code {
            field_type::TINY
            | field_type::SHORT
            | field_type::LONG
            | field_type::LONGLONG
            | field_type::INT24 => ColumnKind::Int,
            field_type::FLOAT | field_type::DOUBLE => ColumnKind::Float,
            _ => ColumnKind::Text,
        }
    }
}

/// A buffered result set owned by the driver.
pub trait DriverRows {
    /// Column metadata, in column order.
    fn fields(&self) -> Vec<FieldMeta>;

    fn num_rows(&self) -> usize;

    /// Move the read offset. Returns `false` if `offset` is out of range.
    fn seek(&mut self, offset: usize) -> bool;

    /// Next row in column order, or `None` once exhausted.
    fn fetch_row(&mut self) -> Option<Vec<SqlValue>>;

    /// Release the underlying buffers. Called exactly once.
    fn free(&mut self);
}

/// Outcome of a single statement as reported by the driver.
pub enum DriverOutcome {
    /// The statement produced a result set.
    Rows(Box<dyn DriverRows>),
    /// The statement succeeded without a result set.
    Done,
    /// The statement failed; carries the driver error text.
    Failed(String),
}

impl std::fmt::Debug for DriverOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rows(rows) => f.debug_tuple("Rows").field(&rows.num_rows()).finish(),
            Self::Done => f.write_str("Done"),
            Self::Failed(msg) => f.debug_tuple("Failed").field(msg).finish(),
        }
    }
}

/// Primitive operations the engine consumes from a wire driver.
///
/// All calls block. Implementations keep their own notion of "last error", "last insert
/// id" and "affected rows", mirroring the classic client libraries.
pub trait Driver {
    /// Open the link. On failure `last_error` describes why.
    fn connect(&mut self, config: &ConnectionConfig) -> bool;

    fn close(&mut self);

    fn execute(&mut self, sql: &str) -> DriverOutcome;

    /// Run a `;`-separated batch and report one outcome per statement that ran.
    ///
    /// # Errors
    /// Returns the driver error text if the batch could not be started at all.
    fn execute_batch(&mut self, sql: &str) -> Result<Vec<DriverOutcome>, String>;

    /// Native string escaping. The result is not quoted.
    fn escape(&self, raw: &str) -> String;

    fn last_insert_id(&self) -> u64;

    fn affected_rows(&self) -> u64;

    fn last_error(&self) -> String;

    fn ping(&mut self) -> bool;

    fn set_charset(&mut self, charset: &str) -> bool;

    /// Whether the server understands `charset` (used to upgrade `utf8` to `utf8mb4`).
    fn supports_charset(&self, _charset: &str) -> bool {
        false
    }

    fn set_autocommit(&mut self, enabled: bool) -> bool;

    fn commit(&mut self) -> bool;

    fn rollback(&mut self) -> bool;

    /// Statement listing the tables of the current database, one name per row.
    fn show_tables_sql(&self) -> &'static str {
        "SHOW TABLES"
    }

    /// Drivers that already hand out typed cells let cursors skip casting.
    fn native_types(&self) -> bool {
        false
    }
}
