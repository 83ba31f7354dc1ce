//! Declarative configuration loading.
//!
//! Boots a [`Configuration`] from a JSON document: environments select a
//! transaction strategy by name, statements declare their SQL, shapes and
//! cardinality. Connection sources are live objects and cannot come from
//! a document, so the caller supplies them by name alongside the JSON.

use super::{Configuration, Environment};
use crate::core::{BindError, DataType, Result};
use crate::datasource::ConnectionSource;
use crate::mapping::{Cardinality, MappedStatement, StatementKind};
use crate::transaction::{DirectTransactionFactory, ManagedTransactionFactory};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ConfigDoc {
    #[serde(default)]
    default_environment: Option<String>,
    environments: Vec<EnvironmentDoc>,
    #[serde(default)]
    statements: Vec<StatementDoc>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentDoc {
    id: String,
    transaction_manager: String,
    #[serde(default)]
    close_connection: bool,
    data_source: String,
}

#[derive(Debug, Deserialize)]
struct StatementDoc {
    key: String,
    #[serde(default = "default_kind")]
    kind: String,
    sql: String,
    #[serde(default)]
    params: Vec<ColumnDoc>,
    #[serde(default)]
    result: Vec<ColumnDoc>,
    #[serde(default = "default_cardinality")]
    cardinality: String,
}

#[derive(Debug, Deserialize)]
struct ColumnDoc {
    name: String,
    #[serde(rename = "type")]
    data_type: String,
}

fn default_kind() -> String {
    "select".into()
}

fn default_cardinality() -> String {
    "many".into()
}

/// Build a [`Configuration`] from a JSON document plus the live connection
/// sources it refers to by name.
pub fn load(
    json: &str,
    sources: HashMap<String, Arc<dyn ConnectionSource>>,
) -> Result<Configuration> {
    let doc: ConfigDoc = serde_json::from_str(json)
        .map_err(|e| BindError::Configuration(format!("invalid configuration document: {e}")))?;

    let mut configuration = Configuration::new();

    for env in &doc.environments {
        let source = sources.get(&env.data_source).ok_or_else(|| {
            BindError::Configuration(format!(
                "environment '{}' refers to unknown data source '{}'",
                env.id, env.data_source
            ))
        })?;

        let builder = Environment::builder(env.id.clone()).data_source_arc(Arc::clone(source));
        let builder = match env.transaction_manager.as_str() {
            "direct" => builder.transaction_factory(DirectTransactionFactory::new()),
            "managed" => builder.transaction_factory(
                ManagedTransactionFactory::new().close_connection(env.close_connection),
            ),
            other => {
                return Err(BindError::Configuration(format!(
                    "environment '{}' names unknown transaction manager '{other}'",
                    env.id
                )));
            }
        };
        configuration.add_environment(builder.build()?)?;
    }

    if let Some(id) = &doc.default_environment {
        configuration.set_default_environment(id)?;
    }

    for stmt in &doc.statements {
        let mut builder = MappedStatement::builder(stmt.key.clone())
            .kind(parse_kind(&stmt.key, &stmt.kind)?)
            .sql(stmt.sql.clone())
            .cardinality(parse_cardinality(&stmt.key, &stmt.cardinality)?);
        for param in &stmt.params {
            builder = builder.param(
                param.name.clone(),
                parse_data_type(&stmt.key, &param.data_type)?,
            );
        }
        for column in &stmt.result {
            builder = builder.result_column(
                column.name.clone(),
                parse_data_type(&stmt.key, &column.data_type)?,
            );
        }
        configuration.add_statement(builder.build()?)?;
    }

    Ok(configuration)
}

fn parse_kind(key: &str, kind: &str) -> Result<StatementKind> {
    match kind {
        "select" => Ok(StatementKind::Select),
        "insert" => Ok(StatementKind::Insert),
        "update" => Ok(StatementKind::Update),
        "delete" => Ok(StatementKind::Delete),
        other => Err(BindError::Configuration(format!(
            "statement '{key}' has unknown kind '{other}'"
        ))),
    }
}

fn parse_cardinality(key: &str, cardinality: &str) -> Result<Cardinality> {
    match cardinality {
        "one" => Ok(Cardinality::One),
        "many" => Ok(Cardinality::Many),
        other => Err(BindError::Configuration(format!(
            "statement '{key}' has unknown cardinality '{other}'"
        ))),
    }
}

fn parse_data_type(key: &str, data_type: &str) -> Result<DataType> {
    match data_type {
        "integer" => Ok(DataType::Integer),
        "float" => Ok(DataType::Float),
        "text" => Ok(DataType::Text),
        "boolean" => Ok(DataType::Boolean),
        other => Err(BindError::Configuration(format!(
            "statement '{key}' declares unknown type '{other}'"
        ))),
    }
}
