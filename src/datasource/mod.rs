pub mod pool;

use crate::core::{BindError, Result, ResultSet, Value};
use crate::transaction::IsolationLevel;

pub use pool::{PooledSource, PoolStats};

/// Driver-level database connection.
///
/// This is the seam to the actual driver: the framework never creates
/// connections itself, it only orchestrates commit/rollback/release around
/// statements issued through this trait. Implementations are expected to
/// surface driver failures as `BindError::Execution` (statement failures)
/// or `BindError::Connection` (link failures).
pub trait Connection: Send {
    /// Execute a row-returning statement with positionally bound parameters.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<ResultSet>;

    /// Execute a modifying statement, returning the affected-row count.
    fn update(&mut self, sql: &str, params: &[Value]) -> Result<u64>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<()>;

    fn set_isolation(&mut self, level: IsolationLevel) -> Result<()>;

    /// Release the connection. Callers treat this as the single release
    /// point; implementations should tolerate repeated calls.
    fn close(&mut self) -> Result<()>;
}

/// Supplier of connections. Pooling and lifecycle are its concern.
///
/// Sources are shared across concurrently open sessions; each session
/// takes its own connection from the source.
pub trait ConnectionSource: Send + Sync {
    fn connection(&self) -> Result<Box<dyn Connection>>;
}

type ConnectFn = dyn Fn() -> Result<Box<dyn Connection>> + Send + Sync;

/// Connection source that opens a fresh connection per request.
///
/// The connect closure is whatever the driver integration provides; this
/// source adds no pooling or reuse.
pub struct UnpooledSource {
    connect: Box<ConnectFn>,
}

impl UnpooledSource {
    pub fn new<F>(connect: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Connection>> + Send + Sync + 'static,
    {
        Self {
            connect: Box::new(connect),
        }
    }
}

impl ConnectionSource for UnpooledSource {
    fn connection(&self) -> Result<Box<dyn Connection>> {
        (self.connect)().map_err(|e| match e {
            BindError::Connection(msg) => BindError::Connection(msg),
            other => BindError::Connection(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureSource;

    #[test]
    fn test_unpooled_opens_fresh_connections() {
        let fixture = std::sync::Arc::new(FixtureSource::new());
        let inner = std::sync::Arc::clone(&fixture);
        let source = UnpooledSource::new(move || inner.connection());

        let _a = source.connection().unwrap();
        let _b = source.connection().unwrap();
        assert_eq!(fixture.acquisitions(), 2);
    }

    #[test]
    fn test_unpooled_wraps_failures_as_connection_errors() {
        let source = UnpooledSource::new(|| {
            Err(BindError::Execution("driver exploded".into()))
        });

        match source.connection() {
            Err(BindError::Connection(msg)) => assert!(msg.contains("driver exploded")),
            Err(other) => panic!("expected Connection error, got {other:?}"),
            Ok(_) => panic!("expected Connection error, got a connection"),
        }
    }
}
