use tracing::{debug, error, warn};

use crate::driver::Driver;

use super::core::{Connection, LinkState};

impl<D: Driver> Connection<D> {
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.state == LinkState::InTransaction
    }

    /// Begin a transaction by turning autocommit off.
    ///
    /// Clears the error log first. Returns `false` (and records an error) if a
    /// transaction is already open or the link is down.
    pub fn begin_transaction(&mut self) -> bool {
        self.clear_errors();

        if self.in_transaction() {
            error!("begin_transaction called while already in a transaction");
            self.errors
                .push("Error: server already in transaction".to_string());
            return false;
        }
        if !self.is_ready() {
            error!("begin_transaction called without a connection");
            self.errors.push("Error: not connected".to_string());
            return false;
        }

        self.driver.set_autocommit(false);
        self.state = LinkState::InTransaction;
        debug!("transaction started");
        true
    }

    /// Commit if no error was recorded since `begin_transaction`, otherwise roll back.
    /// Autocommit is restored either way. Returns whether the transaction committed.
    ///
    /// Without an open transaction the driver is left alone; an error is recorded and
    /// `false` returned.
    pub fn end_transaction(&mut self) -> bool {
        if !self.in_transaction() {
            error!("end_transaction called outside a transaction");
            self.errors.push("Error: no transaction to end".to_string());
            return false;
        }

        let committed = if self.errors.is_empty() {
            self.driver.commit()
        } else {
            warn!(errors = self.errors.len(), "rolling back transaction");
            self.driver.rollback();
            false
        };
        self.leave_transaction();
        debug!(committed, "transaction finished");
        committed
    }

    /// Roll back the open transaction. Outside a transaction this does nothing and
    /// returns `false`.
    pub fn rollback(&mut self) -> bool {
        if !self.in_transaction() {
            return false;
        }
        let rolled_back = self.driver.rollback();
        self.leave_transaction();
        rolled_back
    }

    fn leave_transaction(&mut self) {
        self.driver.set_autocommit(true);
        if self.state == LinkState::InTransaction {
            self.state = LinkState::Connected;
        }
    }
}
