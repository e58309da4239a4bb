use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{debug, error, warn};

use super::core::{Connection, LinkState};
use crate::cache::{QueryCache, sql_cache_key};
use crate::driver::{Driver, DriverOutcome};
use crate::error::SqlClientError;
use crate::placeholders;
use crate::results::{BatchOutcome, Cursor, Executed, QueryResult, ResultSetId};
use crate::types::SqlValue;

/// Driver error text that marks a dropped link worth reconnecting for.
pub const LINK_LOST_MESSAGE: &str = "server has gone away";

static INSERT_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*"?(INSERT|REPLACE)\s+"#).expect("insert pattern is valid")
});

static UPDATE_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*"?(UPDATE|DELETE)\s+"#).expect("update pattern is valid")
});

pub(crate) fn is_link_lost(message: &str) -> bool {
    message.to_ascii_lowercase().contains(LINK_LOST_MESSAGE)
}

impl<D: Driver> Connection<D> {
    /// Execute `sql`, substituting `?` markers with `params` first.
    ///
    /// Statement errors come back as `QueryResult::Failure` and are recorded in the error
    /// log. A dropped link is reconnected and the statement re-issued, at most
    /// `max_reconnect_attempts` times.
    ///
    /// # Errors
    /// Returns `ParameterError`/`EscapeError` when parameters cannot be substituted, and
    /// `LinkLost` once the reconnect budget is spent.
    pub fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<QueryResult, SqlClientError> {
        if !self.is_ready() {
            return Ok(QueryResult::Failure("not connected".into()));
        }
        if sql.trim().is_empty() {
            let message = "Can't execute an empty query".to_string();
            self.record_error(message.clone());
            return Ok(QueryResult::Failure(message));
        }

        let sql = placeholders::substitute(sql, params, &self.escaper())?;
        self.run(&sql)
    }

    fn run(&mut self, sql: &str) -> Result<QueryResult, SqlClientError> {
        loop {
            let started = Instant::now();
            let outcome = self.driver.execute(sql);
            let elapsed = started.elapsed();
            self.query_count += 1;

            let message = match outcome {
                DriverOutcome::Failed(message) => message,
                other => {
                    self.reconnect_attempts = 0;
                    return Ok(self.dispatch(sql, other, elapsed));
                }
            };

            if !is_link_lost(&message) {
                self.reconnect_attempts = 0;
                self.record_error(format!("{message} | {sql}"));
                return Ok(QueryResult::Failure(message));
            }

            self.reconnect_attempts += 1;
            let max = self.config.max_reconnect_attempts;
            if self.reconnect_attempts > max {
                error!(attempts = max, error = %message, sql, "link lost, giving up");
                self.reconnect_attempts = 0;
                self.errors.push(format!("{message} | {sql}"));
                self.state = LinkState::Disconnected;
                return Err(SqlClientError::LinkLost {
                    attempts: max,
                    message,
                });
            }

            warn!(
                attempt = self.reconnect_attempts,
                max,
                error = %message,
                "link lost, reconnecting"
            );
            if let Err(err) = self.reconnect(true) {
                warn!(error = %err, "reconnect failed");
            }
        }
    }

    fn next_result_set_id(&mut self) -> ResultSetId {
        self.next_result_set += 1;
        ResultSetId::new(self.next_result_set)
    }

    fn dispatch(&mut self, sql: &str, outcome: DriverOutcome, elapsed: Duration) -> QueryResult {
        match outcome {
            DriverOutcome::Rows(rows) => {
                let id = self.next_result_set_id();
                let native = self.driver.native_types();
                debug!(sql, ?elapsed, rows = rows.num_rows(), result_set = %id, "select");
                QueryResult::Rows(Cursor::new(id, sql, rows, native))
            }
            DriverOutcome::Done if INSERT_LIKE.is_match(sql) => {
                let id = self.driver.last_insert_id();
                debug!(sql, ?elapsed, insert_id = id, "insert");
                QueryResult::InsertId(id)
            }
            DriverOutcome::Done if UPDATE_LIKE.is_match(sql) => {
                let affected = self.driver.affected_rows();
                debug!(sql, ?elapsed, affected, "update");
                QueryResult::AffectedRows(affected)
            }
            DriverOutcome::Done => {
                debug!(sql, ?elapsed, "statement");
                QueryResult::Ack
            }
            DriverOutcome::Failed(message) => {
                self.record_error(format!("{message} | {sql}"));
                QueryResult::Failure(message)
            }
        }
    }

    /// Run a `;`-separated batch.
    ///
    /// Returns every statement's result when at least one produced rows, otherwise
    /// whether all of them succeeded. Batches are not retried on link loss.
    pub fn multi_query(&mut self, sql: &str) -> BatchOutcome {
        if !self.is_ready() {
            return BatchOutcome::Completed(false);
        }
        if sql.trim().is_empty() {
            self.record_error("Can't execute an empty query".to_string());
            return BatchOutcome::Completed(false);
        }

        let started = Instant::now();
        let outcomes = match self.driver.execute_batch(sql) {
            Ok(outcomes) => outcomes,
            Err(message) => {
                self.record_error(format!("{message} | {sql}"));
                return BatchOutcome::Completed(false);
            }
        };
        self.query_count += 1;
        debug!(sql, elapsed = ?started.elapsed(), statements = outcomes.len(), "batch");

        let mut any_rows = false;
        let mut results = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            let result = match outcome {
                DriverOutcome::Rows(rows) => {
                    any_rows = true;
                    let id = self.next_result_set_id();
                    QueryResult::Rows(Cursor::new(id, sql, rows, self.driver.native_types()))
                }
                DriverOutcome::Done => QueryResult::Ack,
                DriverOutcome::Failed(message) => {
                    self.record_error(format!("{message} | {sql}"));
                    QueryResult::Failure(message)
                }
            };
            results.push(result);
        }

        if any_rows {
            BatchOutcome::Results(results)
        } else {
            BatchOutcome::Completed(results.iter().all(|r| !r.is_failure()))
        }
    }

    /// Execute `sql` and return SELECT rows as JSON objects.
    ///
    /// With a cache, rows are memoized under [`sql_cache_key`] for `ttl` and served from
    /// there on later calls. Non-SELECT statements are never cached.
    ///
    /// # Errors
    /// Propagates `query` errors, and `JsonError` if a row cannot be represented as JSON.
    pub fn exec_sql(
        &mut self,
        sql: &str,
        cache: Option<&mut dyn QueryCache>,
        ttl: Duration,
    ) -> Result<Executed, SqlClientError> {
        let key = sql_cache_key(sql);
        if let Some(cache) = cache.as_deref()
            && cache.exists(&key)
            && let Some(serde_json::Value::Array(items)) = cache.get(&key)
        {
            debug!(sql, key = %key, "served from cache");
            let rows = items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect();
            return Ok(Executed::Rows(rows));
        }

        let mut cursor = match self.query(sql, &[])? {
            QueryResult::Rows(cursor) => cursor,
            other => return Ok(Executed::Outcome(other)),
        };
        let rows = cursor
            .fetch_all_records()
            .iter()
            .map(crate::results::Row::to_json)
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(cache) = cache
            && !cache.set(
                &key,
                serde_json::Value::Array(rows.iter().cloned().map(serde_json::Value::Object).collect()),
                ttl,
            )
        {
            warn!(key = %key, "cache rejected query result");
        }
        Ok(Executed::Rows(rows))
    }

    /// Names of all tables in the current database.
    ///
    /// # Errors
    /// Propagates `query` errors.
    pub fn get_all_tables(&mut self) -> Result<Vec<String>, SqlClientError> {
        let sql = self.driver.show_tables_sql();
        let QueryResult::Rows(mut cursor) = self.query(sql, &[])? else {
            return Ok(Vec::new());
        };
        Ok(cursor
            .fetch_all_records()
            .into_iter()
            .filter_map(|row| match row.get_by_index(0) {
                Some(SqlValue::Text(name)) => Some(name.clone()),
                _ => None,
            })
            .collect())
    }
}
