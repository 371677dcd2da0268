//! Despacho por nombre: `Dispatcher` (un backend) y `FunctionChain`
//! (varios backends ordenados).

pub mod chain;
pub mod dispatcher;

pub use chain::FunctionChain;
pub use dispatcher::{DispatchOutcome, Dispatcher, SpecificFunctions};
