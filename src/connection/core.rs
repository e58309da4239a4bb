use std::fmt;

use tracing::{debug, error, warn};

use crate::config::ConnectionConfig;
use crate::driver::Driver;
use crate::error::SqlClientError;
use crate::escape::{EscapeOptions, Escaped, ValueEscaper};
use crate::types::SqlValue;

/// Where the link currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    Disconnected,
    Connected,
    InTransaction,
}

/// A single blocking client connection over a [`Driver`].
///
/// Statements run one at a time on the caller's thread. The connection owns its error
/// log, its reconnect counter and its transaction flag; nothing is shared between
/// connections.
pub struct Connection<D: Driver> {
    pub(crate) config: ConnectionConfig,
    pub(crate) driver: D,
    pub(crate) state: LinkState,
    pub(crate) reconnect_attempts: u32,
    pub(crate) errors: Vec<String>,
    pub(crate) query_count: u64,
    pub(crate) next_result_set: u64,
    pub(crate) convert_null_to_empty_string: bool,
    charset: String,
}

impl<D: Driver> Connection<D> {
    /// Validate `config` and connect eagerly.
    ///
    /// # Errors
    /// Returns `SqlClientError::ConfigError` if host, user or database is missing, or
    /// `ConnectionError` if the driver cannot connect.
    pub fn new(config: ConnectionConfig, driver: D) -> Result<Self, SqlClientError> {
        let config = config.normalized();
        config.validate()?;

        let mut conn = Self {
            convert_null_to_empty_string: config.convert_null_to_empty_string,
            charset: config.charset.clone(),
            config,
            driver,
            state: LinkState::Disconnected,
            reconnect_attempts: 0,
            errors: Vec::new(),
            query_count: 0,
            next_result_set: 0,
        };
        conn.connect()?;
        Ok(conn)
    }

    /// Open the link unless it is already up, then negotiate the charset.
    ///
    /// # Errors
    /// Returns `SqlClientError::ConnectionError` with the driver's error text.
    pub fn connect(&mut self) -> Result<(), SqlClientError> {
        if self.is_ready() {
            return Ok(());
        }

        if !self.driver.connect(&self.config) {
            let message = format!(
                "Error connecting to server {}:{}: {}",
                self.config.host,
                self.config.port,
                self.driver.last_error()
            );
            error!(host = %self.config.host, port = self.config.port, "{message}");
            self.errors.push(message.clone());
            return Err(SqlClientError::ConnectionError(message));
        }

        self.state = LinkState::Connected;
        let charset = self.charset.clone();
        if !self.set_charset(&charset) {
            warn!(charset = %charset, "server rejected charset");
        }
        debug!(host = %self.config.host, database = %self.config.database, charset = %self.charset, "connected");
        Ok(())
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state != LinkState::Disconnected
    }

    #[must_use]
    pub fn state(&self) -> LinkState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Borrow the underlying driver.
    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn ping(&mut self) -> bool {
        self.is_ready() && self.driver.ping()
    }

    /// Re-establish the link in place.
    ///
    /// With `check_via_ping` a live link is left alone. A transaction open before a full
    /// reconnect is gone on the server; an error is recorded so `end_transaction` rolls
    /// back.
    ///
    /// # Errors
    /// Returns `SqlClientError::ConnectionError` if the new handshake fails.
    pub fn reconnect(&mut self, check_via_ping: bool) -> Result<(), SqlClientError> {
        if check_via_ping && self.ping() {
            return Ok(());
        }

        let was_in_transaction = self.in_transaction();
        if self.is_ready() {
            self.driver.close();
        }
        self.state = LinkState::Disconnected;
        self.connect()?;

        if was_in_transaction {
            self.record_error("transaction aborted by reconnect".to_string());
            self.driver.set_autocommit(false);
            self.state = LinkState::InTransaction;
        }
        Ok(())
    }

    /// Close the link. Closing a closed connection does nothing.
    pub fn close(&mut self) {
        if self.is_ready() {
            self.driver.close();
            self.state = LinkState::Disconnected;
            debug!(host = %self.config.host, "connection closed");
        }
    }

    #[must_use]
    pub fn charset(&self) -> &str {
        &self.charset
    }

    /// Switch the connection charset. `utf8`/`utf-8` become `utf8mb4` when the server
    /// supports it.
    pub fn set_charset(&mut self, charset: &str) -> bool {
        let mut charset = charset.trim().to_string();
        if charset.eq_ignore_ascii_case("utf8") || charset.eq_ignore_ascii_case("utf-8") {
            charset = "utf8".to_string();
        }
        if charset == "utf8" && self.driver.supports_charset("utf8mb4") {
            charset = "utf8mb4".to_string();
        }
        self.charset.clone_from(&charset);
        self.driver.set_charset(&charset)
    }

    /// Render `NULL` parameters as `''` from now on.
    pub fn set_convert_null_to_empty_string(&mut self, convert: bool) {
        self.convert_null_to_empty_string = convert;
    }

    pub(crate) fn escaper(&self) -> ValueEscaper<'_> {
        ValueEscaper::new(&self.driver, self.convert_null_to_empty_string)
    }

    /// See [`ValueEscaper::escape`].
    ///
    /// # Errors
    /// Returns `SqlClientError::EscapeError` for values with no SQL representation.
    pub fn escape(&self, value: &SqlValue, opts: EscapeOptions) -> Result<Escaped, SqlClientError> {
        self.escaper().escape(value, opts)
    }

    /// See [`ValueEscaper::secure`].
    ///
    /// # Errors
    /// Returns `SqlClientError::EscapeError` for values with no SQL representation.
    pub fn secure(&self, value: &SqlValue) -> Result<String, SqlClientError> {
        self.escaper().secure(value)
    }

    /// See [`ValueEscaper::quote_identifier`].
    ///
    /// # Errors
    /// Returns `SqlClientError::EscapeError` if the name cannot be escaped.
    pub fn quote_identifier(&self, name: &str) -> Result<String, SqlClientError> {
        self.escaper().quote_identifier(name)
    }

    pub(crate) fn record_error(&mut self, message: String) {
        warn!(error = %message, "statement error");
        self.errors.push(message);
    }

    /// Errors recorded since the last `clear_errors` (or `begin_transaction`).
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.errors.last().map(String::as_str)
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Statements sent to the driver so far, retries included.
    #[must_use]
    pub fn query_count(&self) -> u64 {
        self.query_count
    }
}

impl<D: Driver> Drop for Connection<D> {
    fn drop(&mut self) {
        if !self.config.session_to_db {
            self.close();
        }
    }
}

impl<D: Driver> fmt::Debug for Connection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.config.host)
            .field("database", &self.config.database)
            .field("state", &self.state)
            .field("charset", &self.charset)
            .field("errors", &self.errors.len())
            .field("query_count", &self.query_count)
            .finish_non_exhaustive()
    }
}
