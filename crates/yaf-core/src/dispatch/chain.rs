//! Cadena de proveedores de funciones específicas.
//!
//! Varios backends pueden implementar subconjuntos distintos de operaciones;
//! la cadena los consulta por `sort_order` ascendente (estable ante empates)
//! y devuelve el primer resultado `Handled`.

use std::collections::BTreeSet;

use log::debug;

use crate::model::{ArgumentBag, InfraContext};

use super::dispatcher::{DispatchOutcome, SpecificFunctions};

pub struct FunctionChain<E> {
    providers: Vec<Box<dyn SpecificFunctions<E>>>,
}

impl<E> FunctionChain<E> {
    pub fn new() -> Self {
        Self { providers: Vec::new() }
    }

    /// Añade un proveedor manteniendo el orden por `sort_order`.
    pub fn with(mut self, provider: Box<dyn SpecificFunctions<E>>) -> Self {
        self.push(provider);
        self
    }

    pub fn push(&mut self, provider: Box<dyn SpecificFunctions<E>>) {
        self.providers.push(provider);
        self.providers.sort_by_key(|p| p.sort_order());
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn is_supported(&self, operation: &str) -> bool {
        self.providers.iter().any(|p| p.is_supported(operation))
    }

    /// Unión de los nombres soportados por todos los proveedores.
    pub fn supported_names(&self) -> BTreeSet<String> {
        self.providers.iter().flat_map(|p| p.supported_names()).collect()
    }

    pub fn execute(&self, operation: &str, infra: &InfraContext, args: &ArgumentBag) -> Result<DispatchOutcome, E> {
        for (idx, provider) in self.providers.iter().enumerate() {
            if !provider.is_supported(operation) {
                continue;
            }
            match provider.execute(operation, infra, args)? {
                DispatchOutcome::NotSupported => continue,
                handled => {
                    debug!("chain '{operation}': handled by provider #{idx} (sort_order={})", provider.sort_order());
                    return Ok(handled);
                }
            }
        }
        debug!("chain '{operation}': no provider supports it");
        Ok(DispatchOutcome::NotSupported)
    }
}

impl<E> Default for FunctionChain<E> {
    fn default() -> Self {
        Self::new()
    }
}
