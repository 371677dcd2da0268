//! Etiquetas semánticas de tipo (`declared_type` de un parámetro y claves del
//! contexto de infraestructura).
//!
//! La comparación es exacta (sensible a mayúsculas). Las etiquetas primitivas
//! (`bool`, `int`, `float`, `text`, `json`, `any`) permiten un chequeo de
//! compatibilidad del valor enlazado; cualquier otra etiqueta es opaca.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::OpValue;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTag(Cow<'static, str>);

impl TypeTag {
    pub const BOOL: TypeTag = TypeTag::of("bool");
    pub const INT: TypeTag = TypeTag::of("int");
    pub const FLOAT: TypeTag = TypeTag::of("float");
    pub const TEXT: TypeTag = TypeTag::of("text");
    pub const JSON: TypeTag = TypeTag::of("json");
    pub const ANY: TypeTag = TypeTag::of("any");

    /// Etiqueta a partir de un literal estático (usable en `const`).
    pub const fn of(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` para las etiquetas primitivas conocidas.
    pub fn is_primitive(&self) -> bool {
        matches!(self.as_str(), "bool" | "int" | "float" | "text" | "json" | "any")
    }

    /// Compatibilidad valor ↔ etiqueta. `Null` es aceptado siempre (parámetro
    /// nulo); para etiquetas opacas no se puede verificar nada.
    pub fn accepts(&self, value: &OpValue) -> bool {
        match (self.as_str(), value) {
            (_, OpValue::Null) => true,
            ("bool", v) => matches!(v, OpValue::Bool(_)),
            ("int", v) => matches!(v, OpValue::Int(_)),
            ("float", v) => matches!(v, OpValue::Float(_) | OpValue::Int(_)),
            ("text", v) => matches!(v, OpValue::Text(_)),
            ("json", v) => !matches!(v, OpValue::Handle(_)),
            _ => true,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for TypeTag {
    fn from(name: &'static str) -> Self {
        TypeTag::of(name)
    }
}
