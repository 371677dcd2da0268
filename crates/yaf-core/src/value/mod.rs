//! Valores dinámicos (`OpValue`, `Handle`) y etiquetas de tipo (`TypeTag`).

mod op_value;
mod tag;

pub use op_value::{Handle, OpValue};
pub use tag::TypeTag;
