use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlClientError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The link kept dropping after every allowed reconnect.
    #[error("Connection lost after {attempts} reconnect attempts: {message}")]
    LinkLost { attempts: u32, message: String },

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("Escape error: {0}")]
    EscapeError(String),
}
