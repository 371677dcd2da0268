//! Errores del core de despacho.
//!
//! - `BindError`: el binder no pudo satisfacer la firma de una operación
//!   existente (fallo duro, error del caller).
//! - `ConfigurationError`: el registro se construyó desde una fuente inválida
//!   o vacía (fatal al arrancar).
//! - `DispatchError`: tipo de error por defecto para fuentes de operaciones
//!   que no traen el suyo propio.
//!
//! "Operación no soportada" NO es un error: se expresa con
//! `DispatchOutcome::NotSupported`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("operation '{operation}': parameter '{parameter}' (position {position}) could not be bound")]
    Arity { operation: String, parameter: String, position: usize },
    #[error("operation '{operation}': parameter '{parameter}' expects {expected}, got {found}")]
    TypeMismatch { operation: String, parameter: String, expected: String, found: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("operation source '{source_name}' declares no operations")] EmptySource { source_name: String },
    #[error("operation with empty name")] EmptyOperationName,
    #[error("operation '{operation}': parameter at position {position} has an empty name")]
    EmptyParameterName { operation: String, position: usize },
    #[error("operation '{operation}': parameter '{parameter}' declared twice")]
    DuplicateParameter { operation: String, parameter: String },
}

/// Error por defecto de las operaciones registradas.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)] Bind(#[from] BindError),
    #[error("operation failed: {0}")] Failed(String),
}
