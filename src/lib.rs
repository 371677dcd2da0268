//! yaf-data-rust
//!
//! Librería paraguas de la capa de datos:
//! - `yaf_core`: despacho de operaciones por nombre, binding de parámetros y
//!   registro de configuración (`yaf-core`).
//! - `yaf_persistence`: backend Postgres, transacciones y migraciones
//!   (`yaf-persistence`).

pub use yaf_core;
pub use yaf_persistence;

pub use yaf_core::{operation, ArgumentBag, DispatchOutcome, Dispatcher, FunctionChain, InfraContext, OpValue, TypeTag};
pub use yaf_persistence::{DbFunctionType, DbFunctions, PersistenceError};
