//! yaf-core: despacho de operaciones por nombre con binding de parámetros.
//!
//! Flujo: caller → `Dispatcher::execute(name, infra, args)` →
//! `OperationRegistry::lookup` → `ParameterBinder::bind` → handler.
pub mod binding;
pub mod dispatch;
pub mod errors;
pub mod macros;
pub mod model;
pub mod registry;
pub mod settings;
pub mod value;

pub use binding::{BindingSource, NameMatching, ParameterBinder};
pub use dispatch::{DispatchOutcome, Dispatcher, FunctionChain, SpecificFunctions};
pub use errors::{BindError, ConfigurationError, DispatchError};
pub use model::{Argument, ArgumentBag, BoundArguments, InfraContext, OperationDescriptor, ParamDescriptor};
pub use registry::{Operation, OperationBuilder, OperationRegistry, OperationSource};
pub use settings::{RegistryDictionary, RegistryLevel, RegistryOverride};
pub use value::{Handle, OpValue, TypeTag};
