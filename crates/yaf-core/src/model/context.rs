//! Fuentes de valores por llamada (`InfraContext`, `ArgumentBag`) y el resultado
//! del binding (`BoundArguments`).
//!
//! Los tres son propiedad del caller durante la llamada; el despachador sólo
//! los lee.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::BindError;
use crate::value::{OpValue, TypeTag};

/// Mapa de capacidades: etiqueta de tipo → valor de infraestructura.
#[derive(Debug, Clone, Default)]
pub struct InfraContext {
    values: HashMap<TypeTag, OpValue>,
}

impl InfraContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tag: TypeTag, value: OpValue) -> Self {
        self.insert(tag, value);
        self
    }

    /// Inserta (o reemplaza) el valor asociado a `tag`. Un `OpValue::Null`
    /// cuenta como presente ("no hay transacción activa").
    pub fn insert(&mut self, tag: TypeTag, value: OpValue) {
        self.values.insert(tag, value);
    }

    pub fn get(&self, tag: &TypeTag) -> Option<&OpValue> {
        self.values.get(tag)
    }

    pub fn contains(&self, tag: &TypeTag) -> bool {
        self.values.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Entrada de la bolsa de argumentos: nombre opcional + valor.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: OpValue,
}

/// Argumentos del caller, en orden.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentBag {
    entries: Vec<Argument>,
}

impl ArgumentBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>, value: impl Into<OpValue>) -> Self {
        self.entries.push(Argument { name: Some(name.into()),
                                     value: value.into() });
        self
    }

    pub fn positional(mut self, value: impl Into<OpValue>) -> Self {
        self.entries.push(Argument { name: None,
                                     value: value.into() });
        self
    }

    pub fn push(&mut self, name: Option<String>, value: OpValue) {
        self.entries.push(Argument { name, value });
    }

    pub fn entries(&self) -> &[Argument] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(Option<String>, OpValue)> for ArgumentBag {
    fn from_iter<I: IntoIterator<Item = (Option<String>, OpValue)>>(iter: I) -> Self {
        Self { entries: iter.into_iter()
                            .map(|(name, value)| Argument { name, value })
                            .collect() }
    }
}

/// Argumentos finales, en el orden exacto de los parámetros de la operación.
///
/// Los accesores tipados devuelven `BindError::TypeMismatch` si el valor en
/// la posición no tiene el tipo pedido.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArguments {
    operation: String,
    names: Vec<String>,
    values: Vec<OpValue>,
}

impl BoundArguments {
    pub(crate) fn new(operation: String, names: Vec<String>, values: Vec<OpValue>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { operation,
               names,
               values }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[OpValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<OpValue> {
        self.values
    }

    pub fn value(&self, index: usize) -> Result<&OpValue, BindError> {
        self.values.get(index).ok_or_else(|| BindError::Arity { operation: self.operation.clone(),
                                                                 parameter: format!("#{index}"),
                                                                 position: index })
    }

    fn mismatch(&self, index: usize, expected: &str) -> BindError {
        BindError::TypeMismatch { operation: self.operation.clone(),
                                  parameter: self.names.get(index).cloned().unwrap_or_else(|| format!("#{index}")),
                                  expected: expected.to_string(),
                                  found: self.values.get(index).map(|v| v.kind_name()).unwrap_or("nothing").to_string() }
    }

    pub fn bool(&self, index: usize) -> Result<bool, BindError> {
        match self.value(index)? {
            OpValue::Bool(b) => Ok(*b),
            _ => Err(self.mismatch(index, "bool")),
        }
    }

    pub fn int(&self, index: usize) -> Result<i64, BindError> {
        match self.value(index)? {
            OpValue::Int(i) => Ok(*i),
            _ => Err(self.mismatch(index, "int")),
        }
    }

    pub fn opt_int(&self, index: usize) -> Result<Option<i64>, BindError> {
        match self.value(index)? {
            OpValue::Null => Ok(None),
            OpValue::Int(i) => Ok(Some(*i)),
            _ => Err(self.mismatch(index, "int")),
        }
    }

    pub fn float(&self, index: usize) -> Result<f64, BindError> {
        match self.value(index)? {
            OpValue::Float(f) => Ok(*f),
            OpValue::Int(i) => Ok(*i as f64),
            _ => Err(self.mismatch(index, "float")),
        }
    }

    pub fn text(&self, index: usize) -> Result<&str, BindError> {
        match self.value(index)? {
            OpValue::Text(s) => Ok(s),
            _ => Err(self.mismatch(index, "text")),
        }
    }

    pub fn opt_text(&self, index: usize) -> Result<Option<&str>, BindError> {
        match self.value(index)? {
            OpValue::Null => Ok(None),
            OpValue::Text(s) => Ok(Some(s)),
            _ => Err(self.mismatch(index, "text")),
        }
    }

    pub fn json(&self, index: usize) -> Result<Value, BindError> {
        match self.value(index)? {
            OpValue::Handle(_) => Err(self.mismatch(index, "json")),
            other => Ok(other.to_json()),
        }
    }

    /// Extrae un objeto de infraestructura compartido.
    pub fn handle<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, BindError> {
        match self.value(index)? {
            OpValue::Handle(h) => h.downcast::<T>().ok_or_else(|| self.mismatch(index, std::any::type_name::<T>())),
            _ => Err(self.mismatch(index, std::any::type_name::<T>())),
        }
    }

    /// Igual que `handle`, pero `Null` produce `None`.
    pub fn opt_handle<T: Any + Send + Sync>(&self, index: usize) -> Result<Option<Arc<T>>, BindError> {
        match self.value(index)? {
            OpValue::Null => Ok(None),
            _ => self.handle::<T>(index).map(Some),
        }
    }
}
