//! Modelos neutrales: descriptores de operación y fuentes de valores por
//! llamada.

pub mod context;
pub mod descriptor;

pub use context::{Argument, ArgumentBag, BoundArguments, InfraContext};
pub use descriptor::{OperationDescriptor, ParamDescriptor};
