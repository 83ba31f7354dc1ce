use super::Session;
use crate::core::{BindError, Result, Value};
use crate::result::MappedRow;
use std::collections::HashMap;

/// Declared return shape of a data-access interface method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// At most one row; absence is `None`, two or more rows violate the
    /// contract.
    Single,
    /// Zero or more rows.
    Sequence,
    /// Affected-row count of a modifying statement.
    Affected,
}

/// One method of a data-access interface: a name plus a return shape.
#[derive(Debug, Clone)]
pub struct MapperMethod {
    pub name: String,
    pub return_shape: ReturnShape,
}

/// Caller-supplied description of a data-access interface.
///
/// The framework never generates these; it only binds them against the
/// statement registry by `Interface.method` identity.
#[derive(Debug, Clone)]
pub struct MapperDescriptor {
    interface: String,
    methods: Vec<MapperMethod>,
}

impl MapperDescriptor {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            methods: Vec::new(),
        }
    }

    pub fn method(mut self, name: impl Into<String>, return_shape: ReturnShape) -> Self {
        self.methods.push(MapperMethod {
            name: name.into(),
            return_shape,
        });
        self
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn methods(&self) -> &[MapperMethod] {
        &self.methods
    }
}

/// Result of a dispatched mapper call, shaped per the declared method.
#[derive(Debug)]
pub enum MapperValue {
    Single(Option<MappedRow>),
    Sequence(Vec<MappedRow>),
    Affected(u64),
}

struct ResolvedMethod {
    return_shape: ReturnShape,
    statement_key: Option<String>,
}

/// Dispatch-backed implementation of a data-access interface.
///
/// Resolution happens once, at bind time: every declared method is looked
/// up in the configuration's dispatch table and the resulting statement
/// keys are cached here. Invoking an unresolved method fails with a
/// mapping error before any connection is touched.
pub struct Mapper<'a> {
    session: &'a mut Session,
    interface: String,
    methods: HashMap<String, ResolvedMethod>,
}

impl<'a> Mapper<'a> {
    pub(super) fn bind(session: &'a mut Session, descriptor: &MapperDescriptor) -> Result<Self> {
        let configuration = session.configuration();
        if !configuration.has_mapper(descriptor.interface()) {
            return Err(BindError::Mapping(format!(
                "no statements registered for interface '{}'",
                descriptor.interface()
            )));
        }

        let methods = descriptor
            .methods()
            .iter()
            .map(|m| {
                let statement_key = configuration
                    .binding(descriptor.interface(), &m.name)
                    .map(str::to_string);
                (
                    m.name.clone(),
                    ResolvedMethod {
                        return_shape: m.return_shape,
                        statement_key,
                    },
                )
            })
            .collect();

        Ok(Self {
            session,
            interface: descriptor.interface().to_string(),
            methods,
        })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Invoke a declared method, dispatching to its registered statement.
    pub fn invoke(&mut self, method: &str, args: &[Value]) -> Result<MapperValue> {
        let (shape, key) = self.resolve(method)?;
        match shape {
            ReturnShape::Single => Ok(MapperValue::Single(self.session.select_one(&key, args)?)),
            ReturnShape::Sequence => {
                Ok(MapperValue::Sequence(self.session.select_list(&key, args)?))
            }
            ReturnShape::Affected => Ok(MapperValue::Affected(self.session.update(&key, args)?)),
        }
    }

    /// Invoke a method declared with [`ReturnShape::Single`].
    pub fn one(&mut self, method: &str, args: &[Value]) -> Result<Option<MappedRow>> {
        let (shape, key) = self.resolve(method)?;
        self.ensure_shape(method, shape, ReturnShape::Single)?;
        self.session.select_one(&key, args)
    }

    /// Invoke a method declared with [`ReturnShape::Sequence`].
    pub fn list(&mut self, method: &str, args: &[Value]) -> Result<Vec<MappedRow>> {
        let (shape, key) = self.resolve(method)?;
        self.ensure_shape(method, shape, ReturnShape::Sequence)?;
        self.session.select_list(&key, args)
    }

    /// Invoke a method declared with [`ReturnShape::Affected`].
    pub fn affected(&mut self, method: &str, args: &[Value]) -> Result<u64> {
        let (shape, key) = self.resolve(method)?;
        self.ensure_shape(method, shape, ReturnShape::Affected)?;
        self.session.update(&key, args)
    }

    fn resolve(&self, method: &str) -> Result<(ReturnShape, String)> {
        let resolved = self.methods.get(method).ok_or_else(|| {
            BindError::Mapping(format!(
                "method '{method}' not declared on interface '{}'",
                self.interface
            ))
        })?;
        let key = resolved.statement_key.clone().ok_or_else(|| {
            BindError::Mapping(format!(
                "no statement registered for '{}.{method}'",
                self.interface
            ))
        })?;
        Ok((resolved.return_shape, key))
    }

    fn ensure_shape(&self, method: &str, declared: ReturnShape, wanted: ReturnShape) -> Result<()> {
        if declared != wanted {
            return Err(BindError::Mapping(format!(
                "method '{}.{method}' is declared {declared:?}, not {wanted:?}",
                self.interface
            )));
        }
        Ok(())
    }
}
