use crate::core::{BindError, DataType, Result};
use std::fmt;

/// Declared row-count contract of a statement.
///
/// `One` means the caller expects at most one row; a second row is a
/// contract violation, never a truncation. `Many` accepts zero or more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => write!(f, "ONE"),
            Self::Many => write!(f, "MANY"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub fn returns_rows(&self) -> bool {
        matches!(self, Self::Select)
    }
}

/// Declared parameter slot; call arguments bind positionally against the
/// declared list.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub data_type: DataType,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Declared result column.
#[derive(Debug, Clone)]
pub struct ResultColumn {
    pub name: String,
    pub data_type: DataType,
}

impl ResultColumn {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Declared shape of a statement's rows; every mapped row carries exactly
/// these columns, in this order.
#[derive(Debug, Clone, Default)]
pub struct ResultShape {
    columns: Vec<ResultColumn>,
}

impl ResultShape {
    pub fn new(columns: Vec<ResultColumn>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ResultColumn] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A registered, named unit of SQL plus its parameter/result shapes and
/// cardinality contract.
///
/// Keys follow the `Interface.method` convention, which is also what the
/// mapper dispatch table resolves calls onto.
#[derive(Debug, Clone)]
pub struct MappedStatement {
    key: String,
    kind: StatementKind,
    sql: String,
    params: Vec<ParamSpec>,
    result_shape: Option<ResultShape>,
    cardinality: Cardinality,
}

impl MappedStatement {
    pub fn builder(key: impl Into<String>) -> StatementBuilder {
        StatementBuilder {
            key: key.into(),
            kind: StatementKind::Select,
            sql: String::new(),
            params: Vec::new(),
            result_columns: Vec::new(),
            cardinality: Cardinality::Many,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn result_shape(&self) -> Option<&ResultShape> {
        self.result_shape.as_ref()
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }
}

/// Accumulates the optional parts of a statement; `build()` is the
/// validation point.
pub struct StatementBuilder {
    key: String,
    kind: StatementKind,
    sql: String,
    params: Vec<ParamSpec>,
    result_columns: Vec<ResultColumn>,
    cardinality: Cardinality,
}

impl StatementBuilder {
    pub fn kind(mut self, kind: StatementKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = sql.into();
        self
    }

    pub fn param(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.params.push(ParamSpec::new(name, data_type));
        self
    }

    pub fn result_column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.result_columns.push(ResultColumn::new(name, data_type));
        self
    }

    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn build(self) -> Result<MappedStatement> {
        if self.key.trim().is_empty() {
            return Err(BindError::Configuration(
                "statement key cannot be empty".into(),
            ));
        }
        if self.sql.trim().is_empty() {
            return Err(BindError::Configuration(format!(
                "statement '{}' has no SQL text",
                self.key
            )));
        }
        if self.kind.returns_rows() && self.result_columns.is_empty() {
            return Err(BindError::Configuration(format!(
                "select statement '{}' declares no result columns",
                self.key
            )));
        }

        let result_shape = if self.result_columns.is_empty() {
            None
        } else {
            Some(ResultShape::new(self.result_columns))
        };

        Ok(MappedStatement {
            key: self.key,
            kind: self.kind,
            sql: self.sql,
            params: self.params,
            result_shape,
            cardinality: self.cardinality,
        })
    }
}
