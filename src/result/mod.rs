use crate::core::{BindError, Result, ResultSet, Value};
use crate::mapping::MappedStatement;

/// One mapped row: the statement's declared columns paired with their
/// values, in declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow {
    columns: Vec<(String, Value)>,
}

impl MappedRow {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, column: &str) -> Option<bool> {
        self.get(column).and_then(Value::as_bool)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Map a raw row sequence into the statement's declared result shape.
///
/// Every declared column must be present in the raw set and every value
/// must be compatible with its declared type; anything else is a mapping
/// failure, distinct from cardinality violations.
pub fn map_rows(statement: &MappedStatement, raw: ResultSet) -> Result<Vec<MappedRow>> {
    let shape = statement.result_shape().ok_or_else(|| {
        BindError::Mapping(format!(
            "statement '{}' declares no result shape",
            statement.key()
        ))
    })?;

    let mut indices = Vec::with_capacity(shape.columns().len());
    for column in shape.columns() {
        let idx = raw.column_index(&column.name).ok_or_else(|| {
            BindError::Mapping(format!(
                "column '{}' missing from results of statement '{}'",
                column.name,
                statement.key()
            ))
        })?;
        indices.push(idx);
    }

    let mut mapped = Vec::with_capacity(raw.rows.len());
    for row in raw.rows {
        let mut columns = Vec::with_capacity(shape.columns().len());
        for (column, &idx) in shape.columns().iter().zip(&indices) {
            let value = row.get(idx).cloned().ok_or_else(|| {
                BindError::Mapping(format!(
                    "row too short for column '{}' of statement '{}'",
                    column.name,
                    statement.key()
                ))
            })?;
            if !column.data_type.is_compatible(&value) {
                return Err(BindError::Mapping(format!(
                    "column '{}' of statement '{}' expects {}, got {}",
                    column.name,
                    statement.key(),
                    column.data_type,
                    value.type_name()
                )));
            }
            columns.push((column.name.clone(), value));
        }
        mapped.push(MappedRow { columns });
    }

    Ok(mapped)
}

/// Enforce exactly-one-or-none semantics on a mapped row sequence.
///
/// Zero rows is an ordinary absence, not an error; two or more is a
/// contract violation carrying the statement key and the actual count.
pub fn into_one(statement_key: &str, mut rows: Vec<MappedRow>) -> Result<Option<MappedRow>> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop()),
        count => Err(BindError::TooManyResults {
            statement: statement_key.to_string(),
            count,
        }),
    }
}
