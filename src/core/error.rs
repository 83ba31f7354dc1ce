use thiserror::Error;

#[derive(Error, Debug)]
pub enum BindError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Statement '{statement}' expected at most one row, got {count}")]
    TooManyResults { statement: String, count: usize },

    #[error("Lock error: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, BindError>;

impl<T> From<std::sync::PoisonError<T>> for BindError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}
