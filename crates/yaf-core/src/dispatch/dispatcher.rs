//! Fachada de despacho: lookup → bind → invoke.

use std::collections::BTreeSet;

use log::debug;

use crate::binding::{NameMatching, ParameterBinder};
use crate::errors::{BindError, ConfigurationError, DispatchError};
use crate::model::{ArgumentBag, InfraContext};
use crate::registry::{OperationRegistry, OperationSource};
use crate::value::OpValue;

/// Resultado de `execute`. `NotSupported` es rutinario: cada backend soporta
/// un subconjunto distinto de operaciones.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Handled(OpValue),
    NotSupported,
}

impl DispatchOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, DispatchOutcome::Handled(_))
    }

    pub fn value(&self) -> Option<&OpValue> {
        match self {
            DispatchOutcome::Handled(v) => Some(v),
            DispatchOutcome::NotSupported => None,
        }
    }

    pub fn into_value(self) -> Option<OpValue> {
        match self {
            DispatchOutcome::Handled(v) => Some(v),
            DispatchOutcome::NotSupported => None,
        }
    }
}

/// Proveedor de funciones específicas de un backend, tal como lo consume
/// `FunctionChain`.
pub trait SpecificFunctions<E>: Send + Sync {
    /// Orden de consulta dentro de la cadena (menor primero).
    fn sort_order(&self) -> i32 {
        1000
    }

    fn is_supported(&self, operation: &str) -> bool;

    fn supported_names(&self) -> BTreeSet<String>;

    fn execute(&self, operation: &str, infra: &InfraContext, args: &ArgumentBag) -> Result<DispatchOutcome, E>;
}

/// Despachador sobre un registro inmutable. Cada llamada es independiente y
/// puede hacerse en paralelo desde varios hilos.
pub struct Dispatcher<E = DispatchError> {
    registry: OperationRegistry<E>,
    binder: ParameterBinder,
    sort_order: i32,
}

impl<E> Dispatcher<E>
    where E: From<BindError>
{
    pub fn new(registry: OperationRegistry<E>) -> Self {
        Self { registry,
               binder: ParameterBinder::default(),
               sort_order: 1000 }
    }

    /// Construye registro y despachador en un paso.
    pub fn from_source<S>(source: &S) -> Result<Self, ConfigurationError>
        where S: OperationSource<E> + ?Sized
    {
        Ok(Self::new(OperationRegistry::build(source)?))
    }

    pub fn with_name_matching(mut self, name_matching: NameMatching) -> Self {
        self.binder = ParameterBinder::new(name_matching);
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn registry(&self) -> &OperationRegistry<E> {
        &self.registry
    }

    pub fn binder(&self) -> &ParameterBinder {
        &self.binder
    }

    /// Ejecuta `operation`.
    ///
    /// - nombre desconocido → `Ok(NotSupported)`;
    /// - firma imposible de satisfacer → `Err(E::from(BindError))`;
    /// - error del handler → se devuelve tal cual.
    pub fn execute(&self, operation: &str, infra: &InfraContext, args: &ArgumentBag) -> Result<DispatchOutcome, E> {
        let Some(op) = self.registry.operation(operation) else {
            debug!("dispatch '{operation}': not supported by '{}'", self.registry.source_name());
            return Ok(DispatchOutcome::NotSupported);
        };
        let bound = self.binder.bind(&op.descriptor, infra, args)?;
        debug!("dispatch '{}' with {} argument(s)", op.name(), bound.len());
        op.invoke(bound).map(DispatchOutcome::Handled)
    }

    pub fn is_supported(&self, operation: &str) -> bool {
        self.registry.contains(operation)
    }
}

impl<E> SpecificFunctions<E> for Dispatcher<E>
    where E: From<BindError>
{
    fn sort_order(&self) -> i32 {
        self.sort_order
    }

    fn is_supported(&self, operation: &str) -> bool {
        Dispatcher::is_supported(self, operation)
    }

    fn supported_names(&self) -> BTreeSet<String> {
        self.registry.supported_names()
    }

    fn execute(&self, operation: &str, infra: &InfraContext, args: &ArgumentBag) -> Result<DispatchOutcome, E> {
        Dispatcher::execute(self, operation, infra, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::OperationBuilder;
    use crate::value::TypeTag;

    fn dispatcher() -> Dispatcher {
        let ops = vec![OperationBuilder::new("Ping").handler(|_args| Ok(OpValue::from("pong"))),
                       OperationBuilder::new("Fail").handler(|_args| Err(DispatchError::Failed("boom".into()))),
                       OperationBuilder::new("Sub").param("a", TypeTag::INT)
                                                   .param("b", TypeTag::INT)
                                                   .handler(|args| Ok(OpValue::Int(args.int(0)? - args.int(1)?))),];
        Dispatcher::from_source(&ops).expect("dispatcher")
    }

    #[test]
    fn operation_errors_pass_through_unchanged() {
        let err = dispatcher().execute("fail", &InfraContext::new(), &ArgumentBag::new()).unwrap_err();
        assert_eq!(err, DispatchError::Failed("boom".into()));
    }

    #[test]
    fn sub_binds_positionally() {
        let args = ArgumentBag::new().positional(10).positional(4);
        let out = dispatcher().execute("SUB", &InfraContext::new(), &args).expect("sub");
        assert_eq!(out, DispatchOutcome::Handled(OpValue::Int(6)));
    }

    #[test]
    fn unknown_operation_is_not_supported() {
        let d = dispatcher();
        assert!(!d.is_supported("nope"));
        assert_eq!(d.execute("nope", &InfraContext::new(), &ArgumentBag::new()),
                   Ok(DispatchOutcome::NotSupported));
    }
}
