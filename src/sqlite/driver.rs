use rusqlite::{Batch, Connection as RusqliteConnection};
use rusqlite::fallible_iterator::FallibleIterator;
use tracing::debug;

use super::rows::SqliteRows;
use crate::config::ConnectionConfig;
use crate::connection::LINK_LOST_MESSAGE;
use crate::driver::{Driver, DriverOutcome};
use crate::error::SqlClientError;

/// SQLite through `rusqlite`. `config.database` is the file path (or `:memory:`).
///
/// SQLite has no session autocommit switch, so turning autocommit off opens a
/// `BEGIN` that `commit`/`rollback` close and reopen.
#[derive(Debug)]
pub struct SqliteDriver {
    conn: Option<RusqliteConnection>,
    last_error: String,
    last_insert_id: u64,
    affected_rows: u64,
    autocommit: bool,
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self {
            conn: None,
            last_error: String::new(),
            last_insert_id: 0,
            affected_rows: 0,
            autocommit: true,
        }
    }
}

impl SqliteDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The open `rusqlite` handle, if connected.
    #[must_use]
    pub fn handle(&self) -> Option<&RusqliteConnection> {
        self.conn.as_ref()
    }

    fn run(conn: &RusqliteConnection, sql: &str) -> Result<Option<SqliteRows>, SqlClientError> {
        let mut stmt = conn.prepare(sql)?;
        Self::run_statement(&mut stmt)
    }

    fn run_statement(
        stmt: &mut rusqlite::Statement<'_>,
    ) -> Result<Option<SqliteRows>, SqlClientError> {
        if stmt.column_count() == 0 {
            stmt.execute([])?;
            return Ok(None);
        }
        Ok(Some(SqliteRows::collect(stmt)?))
    }

    fn record(&mut self, result: Result<Option<SqliteRows>, SqlClientError>) -> DriverOutcome {
        let Some(conn) = self.conn.as_ref() else {
            return DriverOutcome::Failed(format!("SQLite {LINK_LOST_MESSAGE}"));
        };
        match result {
            Ok(Some(rows)) => {
                self.last_error.clear();
                DriverOutcome::Rows(Box::new(rows))
            }
            Ok(None) => {
                self.last_error.clear();
                self.affected_rows = u64::try_from(conn.changes()).unwrap_or_default();
                self.last_insert_id = u64::try_from(conn.last_insert_rowid()).unwrap_or_default();
                DriverOutcome::Done
            }
            Err(err) => {
                self.last_error = err.to_string();
                DriverOutcome::Failed(self.last_error.clone())
            }
        }
    }

    fn exec_control(&mut self, sql: &str) -> bool {
        let Some(conn) = self.conn.as_ref() else {
            return false;
        };
        match conn.execute_batch(sql) {
            Ok(()) => true,
            Err(err) => {
                self.last_error = err.to_string();
                false
            }
        }
    }

    fn in_open_transaction(&self) -> bool {
        self.conn.as_ref().is_some_and(|c| !c.is_autocommit())
    }

    /// Close the open transaction with `verb`, then reopen one if autocommit is off.
    fn finish_transaction(&mut self, verb: &str) -> bool {
        let mut ok = true;
        if self.in_open_transaction() {
            ok = self.exec_control(verb);
        }
        if !self.autocommit {
            ok &= self.exec_control("BEGIN");
        }
        ok
    }
}

impl Driver for SqliteDriver {
    fn connect(&mut self, config: &ConnectionConfig) -> bool {
        let opened = if config.database == ":memory:" {
            RusqliteConnection::open_in_memory()
        } else {
            RusqliteConnection::open(&config.database)
        };
        match opened {
            Ok(conn) => {
                debug!(path = %config.database, "sqlite database opened");
                self.conn = Some(conn);
                self.autocommit = true;
                true
            }
            Err(err) => {
                self.last_error = err.to_string();
                false
            }
        }
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take()
            && let Err((_, err)) = conn.close()
        {
            self.last_error = err.to_string();
        }
    }

    fn execute(&mut self, sql: &str) -> DriverOutcome {
        let Some(conn) = self.conn.as_ref() else {
            self.last_error = format!("SQLite {LINK_LOST_MESSAGE}");
            return DriverOutcome::Failed(self.last_error.clone());
        };
        let result = Self::run(conn, sql);
        self.record(result)
    }

    fn execute_batch(&mut self, sql: &str) -> Result<Vec<DriverOutcome>, String> {
        let Some(conn) = self.conn.as_ref() else {
            return Err(format!("SQLite {LINK_LOST_MESSAGE}"));
        };

        let mut results = Vec::new();
        let mut batch = Batch::new(conn, sql);
        loop {
            match batch.next() {
                Ok(Some(mut stmt)) => {
                    let result = Self::run_statement(&mut stmt);
                    let failed = result.is_err();
                    results.push(result);
                    if failed {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) if results.is_empty() => return Err(err.to_string()),
                Err(err) => {
                    results.push(Err(err.into()));
                    break;
                }
            }
        }
        drop(batch);

        Ok(results
            .into_iter()
            .map(|result| self.record(result))
            .collect())
    }

    fn escape(&self, raw: &str) -> String {
        raw.replace('\'', "''")
    }

    fn last_insert_id(&self) -> u64 {
        self.last_insert_id
    }

    fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    fn last_error(&self) -> String {
        self.last_error.clone()
    }

    fn ping(&mut self) -> bool {
        self.conn
            .as_ref()
            .is_some_and(|conn| conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)).is_ok())
    }

    fn set_charset(&mut self, charset: &str) -> bool {
        // SQLite text is always UTF-8.
        charset.to_ascii_lowercase().starts_with("utf8")
    }

    fn supports_charset(&self, charset: &str) -> bool {
        charset.eq_ignore_ascii_case("utf8mb4")
    }

    fn set_autocommit(&mut self, enabled: bool) -> bool {
        self.autocommit = enabled;
        if enabled {
            !self.in_open_transaction() || self.exec_control("COMMIT")
        } else {
            self.in_open_transaction() || self.exec_control("BEGIN")
        }
    }

    fn commit(&mut self) -> bool {
        self.finish_transaction("COMMIT")
    }

    fn rollback(&mut self) -> bool {
        self.finish_transaction("ROLLBACK")
    }

    fn show_tables_sql(&self) -> &'static str {
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
    }

    fn native_types(&self) -> bool {
        true
    }
}
