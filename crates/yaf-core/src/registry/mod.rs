pub mod operation;
pub mod types;

pub use operation::{Operation, OperationBuilder, OperationFn};
pub use types::{OperationRegistry, OperationSource};
