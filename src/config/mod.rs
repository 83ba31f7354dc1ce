pub mod loader;

use crate::core::{BindError, Result};
use crate::datasource::ConnectionSource;
use crate::mapping::MappedStatement;
use crate::transaction::TransactionFactory;
use std::collections::HashMap;
use std::sync::Arc;

/// Named binding of a transaction strategy to a connection source.
///
/// Immutable once built; invalid combinations are rejected by
/// [`EnvironmentBuilder::build`], never at use time.
#[derive(Clone)]
pub struct Environment {
    id: String,
    transaction_factory: Arc<dyn TransactionFactory>,
    data_source: Arc<dyn ConnectionSource>,
}

impl Environment {
    pub fn builder(id: impl Into<String>) -> EnvironmentBuilder {
        EnvironmentBuilder {
            id: id.into(),
            transaction_factory: None,
            data_source: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transaction_factory(&self) -> &Arc<dyn TransactionFactory> {
        &self.transaction_factory
    }

    pub fn data_source(&self) -> &Arc<dyn ConnectionSource> {
        &self.data_source
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment").field("id", &self.id).finish()
    }
}

/// Accumulates the parts of an [`Environment`]; `build()` validates.
pub struct EnvironmentBuilder {
    id: String,
    transaction_factory: Option<Arc<dyn TransactionFactory>>,
    data_source: Option<Arc<dyn ConnectionSource>>,
}

impl EnvironmentBuilder {
    pub fn transaction_factory<F: TransactionFactory + 'static>(mut self, factory: F) -> Self {
        self.transaction_factory = Some(Arc::new(factory));
        self
    }

    pub fn transaction_factory_arc(mut self, factory: Arc<dyn TransactionFactory>) -> Self {
        self.transaction_factory = Some(factory);
        self
    }

    pub fn data_source<S: ConnectionSource + 'static>(mut self, source: S) -> Self {
        self.data_source = Some(Arc::new(source));
        self
    }

    pub fn data_source_arc(mut self, source: Arc<dyn ConnectionSource>) -> Self {
        self.data_source = Some(source);
        self
    }

    pub fn build(self) -> Result<Environment> {
        if self.id.trim().is_empty() {
            return Err(BindError::Configuration(
                "environment id cannot be empty".into(),
            ));
        }
        let transaction_factory = self.transaction_factory.ok_or_else(|| {
            BindError::Configuration(format!(
                "environment '{}' has no transaction factory",
                self.id
            ))
        })?;
        let data_source = self.data_source.ok_or_else(|| {
            BindError::Configuration(format!("environment '{}' has no data source", self.id))
        })?;

        Ok(Environment {
            id: self.id,
            transaction_factory,
            data_source,
        })
    }
}

/// The registry: named environments plus registered statements and the
/// mapper dispatch table derived from their keys.
///
/// Built once at startup and read-only afterward; every lookup takes
/// `&self`.
#[derive(Default)]
pub struct Configuration {
    environments: HashMap<String, Environment>,
    default_environment: Option<String>,
    statements: HashMap<String, MappedStatement>,
    // (interface, method) -> statement key, populated as statements are
    // registered so dispatch never resolves at call time.
    bindings: HashMap<(String, String), String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an environment. The first one registered becomes the
    /// default until [`set_default_environment`](Self::set_default_environment)
    /// says otherwise.
    pub fn add_environment(&mut self, environment: Environment) -> Result<()> {
        let id = environment.id().to_string();
        if self.environments.contains_key(&id) {
            return Err(BindError::Configuration(format!(
                "duplicate environment id '{id}'"
            )));
        }
        if self.default_environment.is_none() {
            self.default_environment = Some(id.clone());
        }
        self.environments.insert(id, environment);
        Ok(())
    }

    pub fn set_default_environment(&mut self, id: &str) -> Result<()> {
        if !self.environments.contains_key(id) {
            return Err(BindError::Configuration(format!(
                "unknown environment id '{id}'"
            )));
        }
        self.default_environment = Some(id.to_string());
        Ok(())
    }

    pub fn environment(&self, id: &str) -> Result<&Environment> {
        self.environments
            .get(id)
            .ok_or_else(|| BindError::Configuration(format!("unknown environment id '{id}'")))
    }

    pub fn default_environment(&self) -> Result<&Environment> {
        let id = self.default_environment.as_deref().ok_or_else(|| {
            BindError::Configuration("no environments registered".into())
        })?;
        self.environment(id)
    }

    /// Register a statement. Keys of the form `Interface.method` also
    /// populate the mapper dispatch table.
    pub fn add_statement(&mut self, statement: MappedStatement) -> Result<()> {
        let key = statement.key().to_string();
        if self.statements.contains_key(&key) {
            return Err(BindError::Configuration(format!(
                "duplicate statement key '{key}'"
            )));
        }
        if let Some((interface, method)) = key.split_once('.') {
            self.bindings
                .insert((interface.to_string(), method.to_string()), key.clone());
        }
        self.statements.insert(key, statement);
        Ok(())
    }

    pub fn statement(&self, key: &str) -> Result<&MappedStatement> {
        self.statements
            .get(key)
            .ok_or_else(|| BindError::Mapping(format!("no statement registered for key '{key}'")))
    }

    /// Resolve a (interface, method) pair to its statement key.
    pub fn binding(&self, interface: &str, method: &str) -> Option<&str> {
        self.bindings
            .get(&(interface.to_string(), method.to_string()))
            .map(String::as_str)
    }

    /// Whether any statement is registered under the given interface.
    pub fn has_mapper(&self, interface: &str) -> bool {
        self.bindings.keys().any(|(i, _)| i == interface)
    }

    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }
}
