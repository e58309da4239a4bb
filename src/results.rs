//! What a statement hands back: typed outcomes and the cursors behind them.

mod cast;
mod cursor;
mod row;

pub use cursor::{Cursor, ResultSetId};
pub use row::{FetchedRow, OrderedRow, Row};

/// Outcome of `Connection::query`, tagged by what the statement produced.
#[derive(Debug)]
pub enum QueryResult {
    /// A result set.
    Rows(Cursor),
    /// `INSERT`/`REPLACE` succeeded; carries the last insert id.
    InsertId(u64),
    /// `UPDATE`/`DELETE` succeeded; carries the affected row count.
    AffectedRows(u64),
    /// Any other statement succeeded.
    Ack,
    /// The statement failed; the message is also in the connection's error log.
    Failure(String),
}

impl QueryResult {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, QueryResult::Failure(_))
    }

    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        match self {
            QueryResult::Failure(message) => Some(message),
            _ => None,
        }
    }

    #[must_use]
    pub fn insert_id(&self) -> Option<u64> {
        match self {
            QueryResult::InsertId(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn affected_rows(&self) -> Option<u64> {
        match self {
            QueryResult::AffectedRows(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_cursor(self) -> Option<Cursor> {
        match self {
            QueryResult::Rows(cursor) => Some(cursor),
            _ => None,
        }
    }
}

/// Outcome of `Connection::multi_query`.
#[derive(Debug)]
pub enum BatchOutcome {
    /// At least one statement produced rows; one entry per statement.
    Results(Vec<QueryResult>),
    /// No statement produced rows; `true` when every statement succeeded.
    Completed(bool),
}

/// Outcome of `Connection::exec_sql`.
#[derive(Debug)]
pub enum Executed {
    /// Rows of a result set as JSON objects (possibly served from the cache).
    Rows(Vec<serde_json::Map<String, serde_json::Value>>),
    Outcome(QueryResult),
}
