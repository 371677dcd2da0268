use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

/// Valor dinámico que circula por el despachador (argumentos, valores de
/// infraestructura y resultados).
#[derive(Debug, Clone, PartialEq)]
pub enum OpValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(Value),
    /// Objeto de infraestructura (conexión, transacción, fachada...).
    Handle(Handle),
}

/// Referencia opaca y compartida a un objeto de infraestructura.
///
/// Dos handles son iguales sólo si apuntan al mismo objeto.
#[derive(Clone)]
pub struct Handle {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Handle {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self { type_name: std::any::type_name::<T>(),
               inner: value }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.inner.clone().downcast::<T>().ok()
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle").field("type", &self.type_name).finish()
    }
}

impl OpValue {
    pub fn handle<T: Any + Send + Sync>(value: T) -> Self {
        OpValue::Handle(Handle::new(value))
    }

    pub fn shared<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        OpValue::Handle(Handle::from_arc(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, OpValue::Null)
    }

    /// Nombre corto del tipo (para mensajes de error).
    pub fn kind_name(&self) -> &'static str {
        match self {
            OpValue::Null => "null",
            OpValue::Bool(_) => "bool",
            OpValue::Int(_) => "int",
            OpValue::Float(_) => "float",
            OpValue::Text(_) => "text",
            OpValue::Json(_) => "json",
            OpValue::Handle(h) => h.type_name(),
        }
    }

    /// Representación JSON (los handles se muestran por tipo).
    pub fn to_json(&self) -> Value {
        match self {
            OpValue::Null => Value::Null,
            OpValue::Bool(b) => json!(b),
            OpValue::Int(i) => json!(i),
            OpValue::Float(f) => json!(f),
            OpValue::Text(s) => json!(s),
            OpValue::Json(v) => v.clone(),
            OpValue::Handle(h) => json!(format!("<handle {}>", h.type_name())),
        }
    }

    /// Conversión inversa: números enteros → `Int`, resto de escalares a su
    /// variante; arrays y objetos quedan como `Json`.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => OpValue::Null,
            Value::Bool(b) => OpValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => OpValue::Int(i),
                None => n.as_f64().map(OpValue::Float).unwrap_or(OpValue::Json(Value::Number(n))),
            },
            Value::String(s) => OpValue::Text(s),
            other => OpValue::Json(other),
        }
    }
}

impl From<bool> for OpValue {
    fn from(v: bool) -> Self {
        OpValue::Bool(v)
    }
}

impl From<i64> for OpValue {
    fn from(v: i64) -> Self {
        OpValue::Int(v)
    }
}

impl From<i32> for OpValue {
    fn from(v: i32) -> Self {
        OpValue::Int(v as i64)
    }
}

impl From<f64> for OpValue {
    fn from(v: f64) -> Self {
        OpValue::Float(v)
    }
}

impl From<&str> for OpValue {
    fn from(v: &str) -> Self {
        OpValue::Text(v.to_string())
    }
}

impl From<String> for OpValue {
    fn from(v: String) -> Self {
        OpValue::Text(v)
    }
}

impl From<Value> for OpValue {
    fn from(v: Value) -> Self {
        OpValue::Json(v)
    }
}

impl<T: Into<OpValue>> From<Option<T>> for OpValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(OpValue::Null)
    }
}
