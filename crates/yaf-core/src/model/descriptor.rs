use serde::{Deserialize, Serialize};

use crate::value::TypeTag;

/// Parámetro formal de una operación.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    pub declared_type: TypeTag,
    /// Posición 0-based; define el orden de binding.
    pub position: usize,
}

/// Firma de una operación registrada. Inmutable tras construir el registro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub name: String,
    pub parameters: Vec<ParamDescriptor>,
}

impl OperationDescriptor {
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// Firma legible, p.ej. `add(tx: IDbTransaction, x: int)`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.parameters
                                      .iter()
                                      .map(|p| format!("{}: {}", p.name, p.declared_type))
                                      .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}
