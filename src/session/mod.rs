pub mod mapper;

use crate::config::{Configuration, Environment};
use crate::core::{BindError, Result, Value};
use crate::executor::{Executor, SimpleExecutor};
use crate::mapping::MappedStatement;
use crate::result::{MappedRow, into_one, map_rows};
use crate::transaction::{IsolationLevel, Transaction, TransactionFactory};
use log::{debug, warn};
use std::fmt;
use std::sync::Arc;

pub use mapper::{Mapper, MapperDescriptor, MapperMethod, MapperValue, ReturnShape};

/// Session lifecycle.
///
/// ```text
/// Open ──commit──> Committed ──┐
///   │                          │
///   ├──rollback──> RolledBack ─┼──close──> Closed
///   │                          │
///   └──execution failure──> Failed (only rollback/close valid)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Committed,
    RolledBack,
    Failed,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Committed => write!(f, "COMMITTED"),
            Self::RolledBack => write!(f, "ROLLED_BACK"),
            Self::Failed => write!(f, "FAILED"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Stateless factory opening [`Session`]s against a configured environment.
///
/// Transaction acquisition is LAZY: opening a session takes nothing from
/// the connection source; the transaction (and its connection) is created
/// on the first statement execution. Short-lived sessions that never
/// execute cost the pool nothing, and connection failures surface from the
/// first executing call rather than from `open_session`.
pub struct SessionFactory {
    configuration: Arc<Configuration>,
}

impl SessionFactory {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration: Arc::new(configuration),
        }
    }

    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }

    /// Open a session against the default environment.
    pub fn open_session(&self) -> Result<Session> {
        let environment = self.configuration.default_environment()?.clone();
        Ok(self.session(environment, None, false))
    }

    /// Open a session against a named environment.
    pub fn open_session_env(&self, environment_id: &str) -> Result<Session> {
        let environment = self.configuration.environment(environment_id)?.clone();
        Ok(self.session(environment, None, false))
    }

    /// Open a session with explicit isolation and autocommit intent.
    pub fn open_session_with(
        &self,
        environment_id: &str,
        isolation: Option<IsolationLevel>,
        auto_commit: bool,
    ) -> Result<Session> {
        let environment = self.configuration.environment(environment_id)?.clone();
        Ok(self.session(environment, isolation, auto_commit))
    }

    fn session(
        &self,
        environment: Environment,
        isolation: Option<IsolationLevel>,
        auto_commit: bool,
    ) -> Session {
        debug!("session opened against environment '{}'", environment.id());
        Session {
            configuration: Arc::clone(&self.configuration),
            environment,
            transaction: None,
            executor: SimpleExecutor::new(),
            isolation,
            auto_commit,
            state: SessionState::Open,
        }
    }
}

/// The unit of work: one transaction, one executor, bound for life.
///
/// Not safe for concurrent use; each logical unit of work opens its own
/// session. Always release via [`close`](Self::close). `Drop` backstops
/// a forgotten close but logs a warning, since release should be an
/// explicit part of every exit path.
pub struct Session {
    configuration: Arc<Configuration>,
    environment: Environment,
    transaction: Option<Box<dyn Transaction>>,
    executor: SimpleExecutor,
    isolation: Option<IsolationLevel>,
    auto_commit: bool,
    state: SessionState,
}

impl Session {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn environment_id(&self) -> &str {
        self.environment.id()
    }

    /// Execute a row-returning statement, expecting at most one row.
    ///
    /// Zero rows yields `None`; two or more is a
    /// [`BindError::TooManyResults`] contract violation.
    pub fn select_one(&mut self, key: &str, args: &[Value]) -> Result<Option<MappedRow>> {
        let rows = self.run_query(key, args)?;
        into_one(key, rows)
    }

    /// Execute a row-returning statement, yielding all rows. Zero rows is
    /// an empty vector, not an error, whatever the declared cardinality.
    pub fn select_list(&mut self, key: &str, args: &[Value]) -> Result<Vec<MappedRow>> {
        self.run_query(key, args)
    }

    /// Execute a modifying statement, returning the affected-row count.
    pub fn update(&mut self, key: &str, args: &[Value]) -> Result<u64> {
        self.ensure_executable()?;
        let configuration = Arc::clone(&self.configuration);
        let statement = configuration.statement(key)?;
        let executor = self.executor;
        let outcome = {
            let tx = Self::ensure_transaction(
                &mut self.transaction,
                &self.environment,
                self.isolation,
                self.auto_commit,
            )?;
            let conn = tx.connection()?;
            executor.update(conn, statement, args)
        };
        self.fail_on_execution_error(statement, outcome)
    }

    /// Dispatch-backed view of a data-access interface, bound to this
    /// session. Fails when no statement is registered for the interface.
    pub fn mapper(&mut self, descriptor: &MapperDescriptor) -> Result<Mapper<'_>> {
        Mapper::bind(self, descriptor)
    }

    /// Commit the unit of work. Valid only while the session is open; a
    /// session that never executed a statement commits as a no-op.
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_state(SessionState::Open, "commit")?;
        let outcome = match self.transaction.as_mut() {
            Some(tx) => tx.commit(),
            None => {
                debug!("commit with no statements executed; nothing to do");
                Ok(())
            }
        };
        match outcome {
            Ok(()) => {
                self.state = SessionState::Committed;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// Roll the unit of work back. Valid while open and after a failed
    /// execution.
    pub fn rollback(&mut self) -> Result<()> {
        if !matches!(self.state, SessionState::Open | SessionState::Failed) {
            return Err(BindError::Transaction(format!(
                "cannot rollback: session is {}",
                self.state
            )));
        }
        let outcome = match self.transaction.as_mut() {
            Some(tx) => tx.rollback(),
            None => {
                debug!("rollback with no statements executed; nothing to do");
                Ok(())
            }
        };
        match outcome {
            Ok(()) => {
                self.state = SessionState::RolledBack;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// Release the transaction. Idempotent, valid from every state, and
    /// the one guaranteed release point: wrap session use so close runs on
    /// every exit path, including after commit/rollback failures.
    pub fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        let result = match self.transaction.as_mut() {
            Some(tx) => tx.close(),
            None => Ok(()),
        };
        self.state = SessionState::Closed;
        debug!("session closed");
        result
    }

    pub(crate) fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }

    fn run_query(&mut self, key: &str, args: &[Value]) -> Result<Vec<MappedRow>> {
        self.ensure_executable()?;
        let configuration = Arc::clone(&self.configuration);
        let statement = configuration.statement(key)?;
        let executor = self.executor;
        let outcome = {
            let tx = Self::ensure_transaction(
                &mut self.transaction,
                &self.environment,
                self.isolation,
                self.auto_commit,
            )?;
            let conn = tx.connection()?;
            executor.query(conn, statement, args)
        };
        let raw = self.fail_on_execution_error(statement, outcome)?;
        map_rows(statement, raw)
    }

    /// Lazy transaction acquisition; the first statement execution takes a
    /// connection from the environment's source.
    fn ensure_transaction<'a>(
        transaction: &'a mut Option<Box<dyn Transaction>>,
        environment: &Environment,
        isolation: Option<IsolationLevel>,
        auto_commit: bool,
    ) -> Result<&'a mut Box<dyn Transaction>> {
        if transaction.is_none() {
            debug!(
                "acquiring transaction from environment '{}'",
                environment.id()
            );
            let tx = environment.transaction_factory().new_transaction(
                environment.data_source().as_ref(),
                isolation,
                auto_commit,
            )?;
            *transaction = Some(tx);
        }
        transaction
            .as_mut()
            .ok_or_else(|| BindError::Transaction("transaction unavailable".into()))
    }

    /// Execution failures poison the session: only rollback and close
    /// remain valid. Binding failures happen before any database
    /// interaction and leave the session usable.
    fn fail_on_execution_error<T>(
        &mut self,
        statement: &MappedStatement,
        outcome: Result<T>,
    ) -> Result<T> {
        match outcome {
            Ok(value) => Ok(value),
            Err(e @ BindError::Mapping(_)) => Err(e),
            Err(e) => {
                warn!(
                    "statement '{}' failed; session now valid only for rollback/close: {e}",
                    statement.key()
                );
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    fn ensure_executable(&self) -> Result<()> {
        match self.state {
            SessionState::Open => Ok(()),
            SessionState::Failed => Err(BindError::Transaction(
                "session has failed; only rollback or close are valid".into(),
            )),
            other => Err(BindError::Transaction(format!(
                "cannot execute statements: session is {other}"
            ))),
        }
    }

    fn ensure_state(&self, expected: SessionState, action: &str) -> Result<()> {
        if self.state != expected {
            return Err(BindError::Transaction(format!(
                "cannot {action}: session is {}",
                self.state
            )));
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            if self.transaction.is_some() {
                warn!("session dropped without close(); releasing transaction");
            }
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, ResultSet};
    use crate::fixture::FixtureSource;
    use crate::mapping::Cardinality;
    use crate::transaction::DirectTransactionFactory;
    use std::sync::Arc;

    fn factory(source: Arc<FixtureSource>) -> SessionFactory {
        let mut config = Configuration::new();
        config
            .add_environment(
                Environment::builder("dev")
                    .transaction_factory(DirectTransactionFactory::new())
                    .data_source_arc(source)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        config
            .add_statement(
                MappedStatement::builder("UserMapper.selectByName")
                    .sql("SELECT name FROM users WHERE name = ?")
                    .param("name", DataType::Text)
                    .result_column("name", DataType::Text)
                    .cardinality(Cardinality::One)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        SessionFactory::new(config)
    }

    fn one_row_source() -> Arc<FixtureSource> {
        Arc::new(FixtureSource::new().with_result(
            "SELECT name FROM users WHERE name = ?",
            ResultSet::new(vec!["name".into()], vec![vec!["chenqincheng".into()]]),
        ))
    }

    #[test]
    fn test_open_session_takes_no_connection() {
        let source = one_row_source();
        let factory = factory(Arc::clone(&source));

        let session = factory.open_session().unwrap();
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(source.acquisitions(), 0);
    }

    #[test]
    fn test_first_statement_acquires_connection() {
        let source = one_row_source();
        let factory = factory(Arc::clone(&source));

        let mut session = factory.open_session().unwrap();
        let row = session
            .select_one("UserMapper.selectByName", &["chenqincheng".into()])
            .unwrap()
            .unwrap();
        assert_eq!(row.get_str("name"), Some("chenqincheng"));
        assert_eq!(source.acquisitions(), 1);

        session.close().unwrap();
    }

    #[test]
    fn test_close_is_idempotent_and_releases_once() {
        let source = one_row_source();
        let factory = factory(Arc::clone(&source));

        let mut session = factory.open_session().unwrap();
        session
            .select_one("UserMapper.selectByName", &["chenqincheng".into()])
            .unwrap();
        session.close().unwrap();
        session.close().unwrap();

        assert_eq!(source.closes(), 1);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_commit_after_close_fails() {
        let source = one_row_source();
        let factory = factory(source);

        let mut session = factory.open_session().unwrap();
        session.close().unwrap();
        assert!(matches!(session.commit(), Err(BindError::Transaction(_))));
    }

    #[test]
    fn test_execution_failure_poisons_session() {
        let source = Arc::new(
            FixtureSource::new().failing_on("SELECT name FROM users WHERE name = ?"),
        );
        let factory = factory(Arc::clone(&source));

        let mut session = factory.open_session().unwrap();
        let result = session.select_one("UserMapper.selectByName", &["x".into()]);
        assert!(matches!(result, Err(BindError::Execution(_))));
        assert_eq!(session.state(), SessionState::Failed);

        // Further execution and commit are refused, rollback and close work.
        assert!(matches!(
            session.select_one("UserMapper.selectByName", &["x".into()]),
            Err(BindError::Transaction(_))
        ));
        assert!(matches!(session.commit(), Err(BindError::Transaction(_))));
        session.rollback().unwrap();
        session.close().unwrap();
        assert_eq!(source.closes(), 1);
    }

    #[test]
    fn test_drop_releases_transaction() {
        let source = one_row_source();
        let factory = factory(Arc::clone(&source));

        {
            let mut session = factory.open_session().unwrap();
            session
                .select_one("UserMapper.selectByName", &["chenqincheng".into()])
                .unwrap();
            // Dropped without close.
        }
        assert_eq!(source.closes(), 1);
    }

    #[test]
    fn test_unknown_environment_fails_at_open() {
        let factory = factory(one_row_source());
        assert!(matches!(
            factory.open_session_env("prod"),
            Err(BindError::Configuration(_))
        ));
    }

    #[test]
    fn test_unknown_statement_is_mapping_error_without_connection() {
        let source = one_row_source();
        let factory = factory(Arc::clone(&source));

        let mut session = factory.open_session().unwrap();
        assert!(matches!(
            session.select_list("UserMapper.missing", &[]),
            Err(BindError::Mapping(_))
        ));
        assert_eq!(source.acquisitions(), 0);
    }
}
