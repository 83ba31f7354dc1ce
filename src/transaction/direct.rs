use super::{IsolationLevel, Transaction, TransactionFactory, TxState};
use crate::core::{BindError, Result};
use crate::datasource::{Connection, ConnectionSource};
use log::{debug, warn};

/// Self-managed transaction: commit and rollback are issued directly on
/// the wrapped connection, and `close()` closes it.
///
/// When the connection runs in autocommit mode there is no open unit of
/// work to finish, so commit/rollback succeed without touching the
/// connection.
pub struct DirectTransaction {
    conn: Option<Box<dyn Connection>>,
    state: TxState,
    auto_commit: bool,
}

impl DirectTransaction {
    fn open(conn: Box<dyn Connection>, auto_commit: bool) -> Self {
        Self {
            conn: Some(conn),
            state: TxState::Open,
            auto_commit,
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

impl Transaction for DirectTransaction {
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
        if self.auto_commit {
            debug!("autocommit set; skipping explicit commit");
        } else {
            self.connection()?.commit()?;
        }
        self.state = TxState::Committed;
        debug!("transaction committed");
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.auto_commit {
            debug!("autocommit set; skipping explicit rollback");
        } else {
            self.connection()?.rollback()?;
        }
        self.state = TxState::RolledBack;
        debug!("transaction rolled back");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut conn) = self.conn.take() {
            if let Err(e) = conn.close() {
                warn!("connection close failed during release: {e}");
            }
            debug!("transaction closed, connection released");
        }
        self.state = TxState::Closed;
        Ok(())
    }

    fn state(&self) -> TxState {
        self.state
    }
}

impl Drop for DirectTransaction {
    fn drop(&mut self) {
        if self.conn.is_some() {
            warn!("transaction dropped without close(); releasing connection");
            let _ = self.close();
        }
    }
}

/// Factory for the self-managed strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectTransactionFactory;

impl DirectTransactionFactory {
    pub fn new() -> Self {
        Self
    }
}

impl TransactionFactory for DirectTransactionFactory {
    fn transaction_for(&self, conn: Box<dyn Connection>) -> Box<dyn Transaction> {
        // Existing connections keep whatever autocommit mode the caller
        // configured; commit/rollback are issued for real.
        Box::new(DirectTransaction::open(conn, false))
    }

    fn new_transaction(
        &self,
        source: &dyn ConnectionSource,
        isolation: Option<IsolationLevel>,
        auto_commit: bool,
    ) -> Result<Box<dyn Transaction>> {
        let mut conn = source.connection()?;
        if let Some(level) = isolation {
            conn.set_isolation(level)?;
        }
        conn.set_auto_commit(auto_commit)?;
        debug!(
            "opened direct transaction (isolation: {}, autocommit: {})",
            isolation.map_or_else(|| "default".to_string(), |l| l.to_string()),
            auto_commit
        );
        Ok(Box::new(DirectTransaction::open(conn, auto_commit)))
    }
}
