//! Macro utilitaria para declarar operaciones de la tabla de registro.
//!
//! Exportada en la raíz del crate:
//!   use yaf_core::operation;

/// Declara una `Operation` con sus parámetros en orden.
///
/// Formas soportadas:
/// - `operation!(ping() => |_args| Ok(OpValue::Bool(true)))`
/// - `operation!(add(tx: TX_TAG, x: TypeTag::INT) => |args| ...)`
/// - `operation!("GetDBSize"(conn: CONN_TAG) => |args| ...)` // nombre literal
#[macro_export]
macro_rules! operation {
    ($name:literal ( $($pname:ident : $ptag:expr),* $(,)? ) => $handler:expr) => {
        $crate::registry::OperationBuilder::new($name)
            $(.param(stringify!($pname), $ptag))*
            .handler($handler)
    };
    ($name:ident ( $($pname:ident : $ptag:expr),* $(,)? ) => $handler:expr) => {
        $crate::registry::OperationBuilder::new(stringify!($name))
            $(.param(stringify!($pname), $ptag))*
            .handler($handler)
    };
}
