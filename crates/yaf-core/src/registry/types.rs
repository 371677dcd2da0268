//! Registro de operaciones: índice nombre → operación construido una única
//! vez a partir de una `OperationSource`.
//!
//! Tras `build` el registro es inmutable; las lecturas concurrentes no
//! requieren sincronización.

use std::collections::{BTreeSet, HashMap};

use log::{debug, warn};

use crate::errors::ConfigurationError;
use crate::model::OperationDescriptor;

use super::operation::Operation;

/// Origen declarativo de operaciones (la "clase estática" de funciones
/// específicas de un backend).
pub trait OperationSource<E> {
    /// Nombre del origen, para diagnósticos.
    fn source_name(&self) -> &str {
        "anonymous"
    }

    /// Tabla de registro, en orden de declaración.
    fn operations(&self) -> Vec<Operation<E>>;
}

impl<E> OperationSource<E> for Vec<Operation<E>> {
    fn operations(&self) -> Vec<Operation<E>> {
        self.clone()
    }
}

/// Clave de lookup: nombre en minúsculas.
fn lookup_key(name: &str) -> String {
    name.to_lowercase()
}

pub struct OperationRegistry<E> {
    source_name: String,
    operations: HashMap<String, Operation<E>>,
}

impl<E> OperationRegistry<E> {
    /// Construye el índice a partir de `source`.
    ///
    /// Falla si el origen no declara operaciones o alguna operación es
    /// inválida (nombre vacío, parámetro sin nombre o repetido). Si dos
    /// operaciones colisionan en nombre (sin distinguir mayúsculas) gana la
    /// última registrada.
    pub fn build<S>(source: &S) -> Result<Self, ConfigurationError>
        where S: OperationSource<E> + ?Sized
    {
        let source_name = source.source_name().to_string();
        let declared = source.operations();
        if declared.is_empty() {
            return Err(ConfigurationError::EmptySource { source_name });
        }

        let mut operations: HashMap<String, Operation<E>> = HashMap::with_capacity(declared.len());
        for op in declared {
            validate(&op.descriptor)?;
            let key = lookup_key(op.name());
            if let Some(previous) = operations.insert(key, op) {
                warn!("operation source '{source_name}': '{}' overwritten by a later registration",
                      previous.name());
            }
        }

        debug!("operation registry built from '{source_name}': {} operations", operations.len());
        Ok(Self { source_name,
                  operations })
    }

    /// Atajo para construir desde una tabla en memoria.
    pub fn from_operations(operations: Vec<Operation<E>>) -> Result<Self, ConfigurationError> {
        Self::build(&operations)
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Lookup exacto sin distinguir mayúsculas.
    pub fn lookup(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operation(name).map(|op| &op.descriptor)
    }

    pub(crate) fn operation(&self, name: &str) -> Option<&Operation<E>> {
        self.operations.get(&lookup_key(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(&lookup_key(name))
    }

    /// Nombres registrados (con la capitalización de su declaración).
    pub fn supported_names(&self) -> BTreeSet<String> {
        self.operations.values().map(|op| op.name().to_string()).collect()
    }

    /// Descriptores ordenados por nombre.
    pub fn descriptors(&self) -> Vec<&OperationDescriptor> {
        let mut out: Vec<&OperationDescriptor> = self.operations.values().map(|op| &op.descriptor).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

fn validate(descriptor: &OperationDescriptor) -> Result<(), ConfigurationError> {
    if descriptor.name.trim().is_empty() {
        return Err(ConfigurationError::EmptyOperationName);
    }
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for p in &descriptor.parameters {
        if p.name.trim().is_empty() {
            return Err(ConfigurationError::EmptyParameterName { operation: descriptor.name.clone(),
                                                                position: p.position });
        }
        if !seen.insert(p.name.as_str()) {
            return Err(ConfigurationError::DuplicateParameter { operation: descriptor.name.clone(),
                                                                parameter: p.name.clone() });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DispatchError;
    use crate::registry::OperationBuilder;
    use crate::value::{OpValue, TypeTag};

    fn noop(name: &str) -> Operation<DispatchError> {
        OperationBuilder::new(name).handler(|_args| Ok(OpValue::Null))
    }

    #[test]
    fn lookup_ignores_case() {
        let registry = OperationRegistry::from_operations(vec![noop("GetDbSize"), noop("ping")]).expect("registry");
        assert!(registry.lookup("getdbsize").is_some());
        assert!(registry.lookup("PING").is_some());
        assert!(registry.lookup("getdb").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn last_registration_wins_on_duplicates() {
        let first = OperationBuilder::new("Echo").param("a", TypeTag::INT).handler(|_args| Ok(OpValue::Int(1)));
        let second: Operation<DispatchError> = OperationBuilder::new("ECHO").handler(|_args| Ok(OpValue::Int(2)));
        let registry = OperationRegistry::from_operations(vec![first, second]).expect("registry");
        assert_eq!(registry.len(), 1);
        let desc = registry.lookup("echo").expect("echo");
        assert_eq!(desc.name, "ECHO");
        assert!(desc.parameters.is_empty());
    }

    #[test]
    fn empty_source_is_a_configuration_error() {
        let empty: Vec<Operation<DispatchError>> = vec![];
        let err = OperationRegistry::build(&empty).err().expect("must fail");
        assert!(matches!(err, ConfigurationError::EmptySource { .. }));
    }

    #[test]
    fn duplicate_parameter_names_are_rejected() {
        let op: Operation<DispatchError> = OperationBuilder::new("bad").param("x", TypeTag::INT)
                                                                .param("x", TypeTag::INT)
                                                                .handler(|_args| Ok(OpValue::Null));
        let err = OperationRegistry::from_operations(vec![op]).err().expect("must fail");
        assert_eq!(err,
                   ConfigurationError::DuplicateParameter { operation: "bad".into(),
                                                            parameter: "x".into() });
    }

    #[test]
    fn empty_operation_name_is_rejected() {
        for name in ["", "   "] {
            let err = OperationRegistry::from_operations(vec![noop("ping"), noop(name)]).err().expect("must fail");
            assert_eq!(err, ConfigurationError::EmptyOperationName);
        }
    }

    #[test]
    fn empty_parameter_name_is_rejected() {
        let op: Operation<DispatchError> = OperationBuilder::new("registry_save").param("name", TypeTag::TEXT)
                                                                          .param(" ", TypeTag::TEXT)
                                                                          .handler(|_args| Ok(OpValue::Null));
        let err = OperationRegistry::from_operations(vec![op]).err().expect("must fail");
        assert_eq!(err,
                   ConfigurationError::EmptyParameterName { operation: "registry_save".into(),
                                                            position: 1 });
        assert!(err.to_string().contains("position 1"), "{err}");
    }
}
