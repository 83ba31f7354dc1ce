use super::{IsolationLevel, Transaction, TransactionFactory, TxState};
use crate::core::{BindError, Result};
use crate::datasource::{Connection, ConnectionSource};
use log::{debug, warn};

/// Externally-managed transaction: a surrounding container owns the
/// commit/rollback boundaries, so both calls succeed here without touching
/// the connection.
///
/// Beware the close asymmetry: by default `close()` releases this handle
/// but leaves the underlying connection OPEN for the container. Opt into
/// closing it with [`ManagedTransactionFactory::close_connection`].
pub struct ManagedTransaction {
    conn: Option<Box<dyn Connection>>,
    state: TxState,
    close_connection: bool,
}

impl ManagedTransaction {
    fn open(conn: Box<dyn Connection>, close_connection: bool) -> Self {
        Self {
            conn: Some(conn),
            state: TxState::Open,
            close_connection,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if !self.state.is_open() {
            return Err(BindError::Transaction(format!(
                "transaction is {}, expected OPEN",
                self.state
            )));
        }
        Ok(())
    }
}

impl Transaction for ManagedTransaction {
    fn connection(&mut self) -> Result<&mut dyn Connection> {
        match self.conn.as_mut() {
            Some(conn) => Ok(conn.as_mut()),
            None => Err(BindError::Transaction(
                "transaction is closed; connection released".into(),
            )),
        }
    }

    fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        debug!("externally managed transaction; commit ignored");
        self.state = TxState::Committed;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        debug!("externally managed transaction; rollback ignored");
        self.state = TxState::RolledBack;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut conn) = self.conn.take() {
            if self.close_connection {
                if let Err(e) = conn.close() {
                    warn!("connection close failed during release: {e}");
                }
                debug!("managed transaction closed, connection closed");
            } else {
                debug!("managed transaction closed, connection left open for container");
            }
        }
        self.state = TxState::Closed;
        Ok(())
    }

    fn state(&self) -> TxState {
        self.state
    }
}

impl Drop for ManagedTransaction {
    fn drop(&mut self) {
        if self.conn.is_some() {
            warn!("transaction dropped without close(); releasing connection");
            let _ = self.close();
        }
    }
}

/// Factory for the externally-managed strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManagedTransactionFactory {
    close_connection: bool,
}

impl ManagedTransactionFactory {
    pub fn new() -> Self {
        Self {
            close_connection: false,
        }
    }

    /// Close the underlying connection on `close()` instead of leaving it
    /// to the container.
    pub fn close_connection(mut self, close_connection: bool) -> Self {
        self.close_connection = close_connection;
        self
    }
}

impl TransactionFactory for ManagedTransactionFactory {
    fn transaction_for(&self, conn: Box<dyn Connection>) -> Box<dyn Transaction> {
        Box::new(ManagedTransaction::open(conn, self.close_connection))
    }

    fn new_transaction(
        &self,
        source: &dyn ConnectionSource,
        isolation: Option<IsolationLevel>,
        _auto_commit: bool,
    ) -> Result<Box<dyn Transaction>> {
        // Autocommit intent is the container's concern; only isolation is
        // applied here.
        let mut conn = source.connection()?;
        if let Some(level) = isolation {
            conn.set_isolation(level)?;
        }
        debug!(
            "opened managed transaction (isolation: {}, close_connection: {})",
            isolation.map_or_else(|| "default".to_string(), |l| l.to_string()),
            self.close_connection
        );
        Ok(Box::new(ManagedTransaction::open(
            conn,
            self.close_connection,
        )))
    }
}
