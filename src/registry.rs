use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::debug;

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::driver::Driver;
use crate::error::SqlClientError;

/// Named connections keyed by a fingerprint of their configuration.
///
/// Asking twice for the same configuration hands back the same connection. The first
/// connection ever registered is the default.
pub struct ConnectionRegistry<D: Driver> {
    connections: HashMap<String, Connection<D>>,
    default_key: Option<String>,
}

impl<D: Driver> Default for ConnectionRegistry<D> {
    fn default() -> Self {
        Self {
            connections: HashMap::new(),
            default_key: None,
        }
    }
}

impl<D: Driver> ConnectionRegistry<D> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The registered connection for `config`, connecting through `make_driver` on
    /// first use.
    ///
    /// # Errors
    /// Returns the `Connection::new` error if a new connection cannot be opened; nothing
    /// is registered in that case.
    pub fn get_or_connect(
        &mut self,
        config: ConnectionConfig,
        make_driver: impl FnOnce() -> D,
    ) -> Result<&mut Connection<D>, SqlClientError> {
        let key = config.clone().normalized().fingerprint();
        match self.connections.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let conn = Connection::new(config, make_driver())?;
                debug!(key = %entry.key(), "registered connection");
                if self.default_key.is_none() {
                    self.default_key = Some(entry.key().clone());
                }
                Ok(entry.insert(conn))
            }
        }
    }

    /// The first registered connection.
    pub fn default_connection(&mut self) -> Option<&mut Connection<D>> {
        let key = self.default_key.as_ref()?;
        self.connections.get_mut(key)
    }

    pub fn get(&mut self, config: &ConnectionConfig) -> Option<&mut Connection<D>> {
        let key = config.clone().normalized().fingerprint();
        self.connections.get_mut(&key)
    }

    /// Remove and return the connection for `config`. Removing the default promotes no
    /// other connection.
    pub fn remove(&mut self, config: &ConnectionConfig) -> Option<Connection<D>> {
        let key = config.clone().normalized().fingerprint();
        if self.default_key.as_deref() == Some(key.as_str()) {
            self.default_key = None;
        }
        self.connections.remove(&key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
