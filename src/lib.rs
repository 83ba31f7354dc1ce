// ============================================================================
// sqlbind Library
// ============================================================================

//! Declared-statement SQL mapping.
//!
//! Statements are registered once in a [`Configuration`] together with
//! named environments (transaction strategy + connection source); a
//! [`SessionFactory`] then opens units of work whose calls dispatch to
//! those statements and map rows back under a declared cardinality
//! contract.
//!
//! # Examples
//!
//! ```
//! use sqlbind::fixture::FixtureSource;
//! use sqlbind::{
//!     Cardinality, Configuration, DataType, DirectTransactionFactory, Environment,
//!     MappedStatement, ResultSet, SessionFactory,
//! };
//!
//! # fn main() -> sqlbind::Result<()> {
//! // A fixture stands in for the real driver here.
//! let source = FixtureSource::new().with_result(
//!     "SELECT id, name FROM users WHERE name = ?",
//!     ResultSet::new(
//!         vec!["id".into(), "name".into()],
//!         vec![vec![1i64.into(), "chenqincheng".into()]],
//!     ),
//! );
//!
//! let mut config = Configuration::new();
//! config.add_environment(
//!     Environment::builder("dev")
//!         .transaction_factory(DirectTransactionFactory::new())
//!         .data_source(source)
//!         .build()?,
//! )?;
//! config.add_statement(
//!     MappedStatement::builder("UserMapper.selectByName")
//!         .sql("SELECT id, name FROM users WHERE name = ?")
//!         .param("name", DataType::Text)
//!         .result_column("id", DataType::Integer)
//!         .result_column("name", DataType::Text)
//!         .cardinality(Cardinality::One)
//!         .build()?,
//! )?;
//!
//! let factory = SessionFactory::new(config);
//! let mut session = factory.open_session()?;
//! let user = session.select_one("UserMapper.selectByName", &["chenqincheng".into()])?;
//! assert_eq!(user.unwrap().get_str("name"), Some("chenqincheng"));
//! session.commit()?;
//! session.close()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod datasource;
pub mod executor;
pub mod fixture;
pub mod mapping;
pub mod result;
pub mod session;
pub mod transaction;

// Re-export main types for convenience
pub use config::{Configuration, Environment, EnvironmentBuilder, loader};
pub use self::core::{BindError, DataType, Result, ResultSet, Row, Value};
pub use mapping::{Cardinality, MappedStatement, StatementKind};
pub use result::MappedRow;
pub use session::{
    Mapper, MapperDescriptor, MapperValue, ReturnShape, Session, SessionFactory, SessionState,
};
pub use transaction::{
    DirectTransactionFactory, IsolationLevel, ManagedTransactionFactory, Transaction,
    TransactionFactory, TxState,
};

// Re-export the driver seam
pub use datasource::{Connection, ConnectionSource, PooledSource, UnpooledSource};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureSource;

    fn config_with_fixture(source: FixtureSource) -> Configuration {
        let mut config = Configuration::new();
        config
            .add_environment(
                Environment::builder("dev")
                    .transaction_factory(DirectTransactionFactory::new())
                    .data_source(source)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        config
            .add_statement(
                MappedStatement::builder("UserMapper.selectAll")
                    .sql("SELECT name FROM users")
                    .result_column("name", DataType::Text)
                    .cardinality(Cardinality::Many)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        config
    }

    #[test]
    fn test_end_to_end_select_list() {
        let source = FixtureSource::new().with_result(
            "SELECT name FROM users",
            ResultSet::new(
                vec!["name".into()],
                vec![vec!["a".into()], vec!["b".into()]],
            ),
        );
        let factory = SessionFactory::new(config_with_fixture(source));

        let mut session = factory.open_session().unwrap();
        let rows = session.select_list("UserMapper.selectAll", &[]).unwrap();
        assert_eq!(rows.len(), 2);
        session.close().unwrap();
    }

    #[test]
    fn test_empty_sequence_is_not_an_error() {
        let source = FixtureSource::new()
            .with_result("SELECT name FROM users", ResultSet::new(vec!["name".into()], vec![]));
        let factory = SessionFactory::new(config_with_fixture(source));

        let mut session = factory.open_session().unwrap();
        let rows = session.select_list("UserMapper.selectAll", &[]).unwrap();
        assert!(rows.is_empty());
        session.close().unwrap();
    }
}
