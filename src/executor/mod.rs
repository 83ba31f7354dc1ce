use crate::core::{BindError, Result, ResultSet, Value};
use crate::datasource::Connection;
use crate::mapping::MappedStatement;
use log::debug;

/// Issues registered statements against the active connection.
///
/// Parameter binding happens here, before any connection interaction, so
/// arity and type mismatches never reach the driver.
pub trait Executor: Send {
    fn query(
        &self,
        conn: &mut dyn Connection,
        statement: &MappedStatement,
        args: &[Value],
    ) -> Result<ResultSet>;

    fn update(
        &self,
        conn: &mut dyn Connection,
        statement: &MappedStatement,
        args: &[Value],
    ) -> Result<u64>;
}

/// Straightforward executor: bind, issue, return. No reuse or batching.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleExecutor;

impl SimpleExecutor {
    pub fn new() -> Self {
        Self
    }

    fn bind<'a>(&self, statement: &MappedStatement, args: &'a [Value]) -> Result<&'a [Value]> {
        let params = statement.params();
        if args.len() != params.len() {
            return Err(BindError::Mapping(format!(
                "statement '{}' takes {} parameter(s), got {}",
                statement.key(),
                params.len(),
                args.len()
            )));
        }
        for (spec, value) in params.iter().zip(args) {
            if !spec.data_type.is_compatible(value) {
                return Err(BindError::Mapping(format!(
                    "parameter '{}' of statement '{}' expects {}, got {}",
                    spec.name,
                    statement.key(),
                    spec.data_type,
                    value.type_name()
                )));
            }
        }
        Ok(args)
    }
}

impl Executor for SimpleExecutor {
    fn query(
        &self,
        conn: &mut dyn Connection,
        statement: &MappedStatement,
        args: &[Value],
    ) -> Result<ResultSet> {
        if !statement.kind().returns_rows() {
            return Err(BindError::Mapping(format!(
                "statement '{}' is not a select",
                statement.key()
            )));
        }
        let bound = self.bind(statement, args)?;
        let result = conn.query(statement.sql(), bound)?;
        debug!(
            "executed '{}': {} row(s)",
            statement.key(),
            result.row_count()
        );
        Ok(result)
    }

    fn update(
        &self,
        conn: &mut dyn Connection,
        statement: &MappedStatement,
        args: &[Value],
    ) -> Result<u64> {
        if statement.kind().returns_rows() {
            return Err(BindError::Mapping(format!(
                "statement '{}' is a select; use query",
                statement.key()
            )));
        }
        let bound = self.bind(statement, args)?;
        let affected = conn.update(statement.sql(), bound)?;
        debug!("executed '{}': {} row(s) affected", statement.key(), affected);
        Ok(affected)
    }
}
