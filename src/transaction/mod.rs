pub mod direct;
pub mod managed;

use crate::core::Result;
use crate::datasource::{Connection, ConnectionSource};
use std::fmt;

pub use direct::{DirectTransaction, DirectTransactionFactory};
pub use managed::{ManagedTransaction, ManagedTransactionFactory};

/// Requested transaction isolation, applied to the connection at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadUncommitted => write!(f, "READ UNCOMMITTED"),
            Self::ReadCommitted => write!(f, "READ COMMITTED"),
            Self::RepeatableRead => write!(f, "REPEATABLE READ"),
            Self::Serializable => write!(f, "SERIALIZABLE"),
        }
    }
}

/// Transaction lifecycle.
///
/// ```text
/// Unopened ──open──> Open ──commit──> Committed ──┐
///                      │                          ├──close──> Closed
///                      └──rollback──> RolledBack ─┘
/// ```
///
/// `Closed` is reachable from every state; the first close releases the
/// connection, later closes are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Unopened,
    Open,
    Committed,
    RolledBack,
    Closed,
}

impl TxState {
    pub fn is_open(&self) -> bool {
        matches!(self, TxState::Open)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TxState::Closed)
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxState::Unopened => write!(f, "UNOPENED"),
            TxState::Open => write!(f, "OPEN"),
            TxState::Committed => write!(f, "COMMITTED"),
            TxState::RolledBack => write!(f, "ROLLED_BACK"),
            TxState::Closed => write!(f, "CLOSED"),
        }
    }
}

/// One unit of work over exactly one live connection.
///
/// The two strategies implement this trait separately so each one's
/// invariants stay locally checkable: [`DirectTransaction`] owns real
/// commit/rollback boundaries, [`ManagedTransaction`] defers them to a
/// surrounding container.
pub trait Transaction: Send {
    /// The wrapped connection. Fails once the transaction is closed.
    fn connection(&mut self) -> Result<&mut dyn Connection>;

    /// Commit the unit of work. Fails unless the state is `Open`.
    fn commit(&mut self) -> Result<()>;

    /// Roll the unit of work back. Fails unless the state is `Open`.
    fn rollback(&mut self) -> Result<()>;

    /// Release the connection per strategy. Idempotent; the first call
    /// performs the release, and release failures are logged rather than
    /// surfaced so close never blocks a failing path.
    fn close(&mut self) -> Result<()>;

    fn state(&self) -> TxState;
}

/// Produces [`Transaction`]s for one management strategy.
pub trait TransactionFactory: Send + Sync {
    /// Wrap a connection the caller already owns. The transaction takes
    /// over commit/rollback/close per its strategy; acquiring the
    /// connection stays the caller's concern.
    fn transaction_for(&self, conn: Box<dyn Connection>) -> Box<dyn Transaction>;

    /// Acquire a connection from the source, apply isolation and
    /// autocommit intent, and return an `Open` transaction.
    fn new_transaction(
        &self,
        source: &dyn ConnectionSource,
        isolation: Option<IsolationLevel>,
        auto_commit: bool,
    ) -> Result<Box<dyn Transaction>>;
}
