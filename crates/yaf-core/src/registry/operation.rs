//! Entrada de la tabla de registro: descriptor + handler invocable.

use std::fmt;
use std::sync::Arc;

use crate::model::{BoundArguments, OperationDescriptor, ParamDescriptor};
use crate::value::{OpValue, TypeTag};

/// Handler de una operación. Recibe los argumentos ya enlazados en el orden
/// de su firma.
pub type OperationFn<E> = Arc<dyn Fn(BoundArguments) -> Result<OpValue, E> + Send + Sync>;

/// Operación registrable.
pub struct Operation<E> {
    pub descriptor: OperationDescriptor,
    handler: OperationFn<E>,
}

impl<E> Operation<E> {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn invoke(&self, args: BoundArguments) -> Result<OpValue, E> {
        (self.handler)(args)
    }
}

impl<E> Clone for Operation<E> {
    fn clone(&self) -> Self {
        Self { descriptor: self.descriptor.clone(),
               handler: Arc::clone(&self.handler) }
    }
}

impl<E> fmt::Debug for Operation<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation").field("signature", &self.descriptor.signature()).finish()
    }
}

/// Builder de `Operation`: asigna posiciones consecutivas a los parámetros.
#[derive(Debug, Clone)]
pub struct OperationBuilder {
    name: String,
    parameters: Vec<ParamDescriptor>,
}

impl OperationBuilder {
    /// Empieza la declaración de una operación. Los parámetros se declaran en
    /// orden con `param` y se cierra con `handler`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(),
               parameters: Vec::new() }
    }

    pub fn param(mut self, name: impl Into<String>, declared_type: impl Into<TypeTag>) -> Self {
        let position = self.parameters.len();
        self.parameters.push(ParamDescriptor { name: name.into(),
                                               declared_type: declared_type.into(),
                                               position });
        self
    }

    pub fn handler<E, F>(self, f: F) -> Operation<E>
        where F: Fn(BoundArguments) -> Result<OpValue, E> + Send + Sync + 'static
    {
        Operation { descriptor: OperationDescriptor { name: self.name,
                                                      parameters: self.parameters },
                    handler: Arc::new(f) }
    }
}
