use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::driver::Driver;
use crate::error::SqlClientError;

pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_CHARSET: &str = "utf8";
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 3;

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_charset() -> String {
    DEFAULT_CHARSET.to_string()
}

fn default_max_reconnect_attempts() -> u32 {
    DEFAULT_MAX_RECONNECT_ATTEMPTS
}

/// Options for opening a `Connection`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub socket: String,
    #[serde(default = "default_charset")]
    pub charset: String,
    /// Keep the link open when the `Connection` is dropped (sessions stored in the db).
    #[serde(default)]
    pub session_to_db: bool,
    /// Render `NULL` parameters as `''` in `secure()`.
    #[serde(default)]
    pub convert_null_to_empty_string: bool,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

impl ConnectionConfig {
    #[must_use]
    pub fn new(host: &str, user: &str, database: &str) -> Self {
        Self {
            host: host.to_string(),
            user: user.to_string(),
            password: String::new(),
            database: database.to_string(),
            port: DEFAULT_PORT,
            socket: String::new(),
            charset: DEFAULT_CHARSET.to_string(),
            session_to_db: false,
            convert_null_to_empty_string: false,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
        }
    }

    /// Fill in fallbacks for zero/empty values.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.port == 0 {
            self.port = DEFAULT_PORT;
        }
        if self.charset.trim().is_empty() {
            self.charset = DEFAULT_CHARSET.to_string();
        }
        self
    }

    /// Check that host, user and database are present.
    ///
    /// # Errors
    /// Returns `SqlClientError::ConfigError` naming the first missing field.
    pub fn validate(&self) -> Result<(), SqlClientError> {
        if self.host.trim().is_empty() {
            return Err(SqlClientError::ConfigError("no-sql-hostname".into()));
        }
        if self.user.trim().is_empty() {
            return Err(SqlClientError::ConfigError("no-sql-username".into()));
        }
        if self.database.trim().is_empty() {
            return Err(SqlClientError::ConfigError("no-sql-database".into()));
        }
        Ok(())
    }

    /// Stable fingerprint of every field, used to key the connection registry.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let raw = format!(
            "{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}",
            self.host,
            self.user,
            self.password,
            self.database,
            self.port,
            self.socket,
            self.charset,
            self.session_to_db,
            self.convert_null_to_empty_string,
            self.max_reconnect_attempts,
        );
        uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, raw.as_bytes())
            .simple()
            .to_string()
    }
}

/// Fluent builder for `ConnectionConfig`.
#[derive(Debug, Clone)]
pub struct ConnectionConfigBuilder {
    opts: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    #[must_use]
    pub fn new(host: &str, user: &str, database: &str) -> Self {
        Self {
            opts: ConnectionConfig::new(host, user, database),
        }
    }

    #[must_use]
    pub fn password(mut self, password: &str) -> Self {
        self.opts.password = password.to_string();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.opts.port = port;
        self
    }

    #[must_use]
    pub fn socket(mut self, socket: &str) -> Self {
        self.opts.socket = socket.to_string();
        self
    }

    #[must_use]
    pub fn charset(mut self, charset: &str) -> Self {
        self.opts.charset = charset.to_string();
        self
    }

    #[must_use]
    pub fn session_to_db(mut self, session_to_db: bool) -> Self {
        self.opts.session_to_db = session_to_db;
        self
    }

    #[must_use]
    pub fn convert_null_to_empty_string(mut self, convert: bool) -> Self {
        self.opts.convert_null_to_empty_string = convert;
        self
    }

    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.opts.max_reconnect_attempts = attempts;
        self
    }

    #[must_use]
    pub fn finish(self) -> ConnectionConfig {
        self.opts.normalized()
    }

    /// Validate the options and open a `Connection` over `driver`.
    ///
    /// # Errors
    ///
    /// Returns `SqlClientError` if the configuration is incomplete or the initial connect fails.
    pub fn connect<D: Driver>(self, driver: D) -> Result<Connection<D>, SqlClientError> {
        Connection::new(self.finish(), driver)
    }
}

impl ConnectionConfig {
    #[must_use]
    pub fn builder(host: &str, user: &str, database: &str) -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::new(host, user, database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_reported_in_order() {
        let err = ConnectionConfig::new("", "", "").validate().unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: no-sql-hostname");

        let err = ConnectionConfig::new("localhost", "", "app").validate().unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: no-sql-username");

        let err = ConnectionConfig::new("localhost", "root", " ").validate().unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: no-sql-database");
    }

    #[test]
    fn zero_port_and_blank_charset_fall_back() {
        let cfg = ConnectionConfig::builder("h", "u", "d").port(0).charset("").finish();
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.charset, DEFAULT_CHARSET);
    }

    #[test]
    fn deserializes_with_defaults() {
        let cfg: ConnectionConfig =
            serde_json::from_str(r#"{"host":"db","user":"app","database":"shop"}"#).unwrap();
        assert_eq!(cfg, ConnectionConfig::new("db", "app", "shop"));
    }

    #[test]
    fn fingerprint_tracks_every_field() {
        let a = ConnectionConfig::new("db", "app", "shop");
        let b = ConnectionConfig::builder("db", "app", "shop").password("x").finish();
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
