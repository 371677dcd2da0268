//! Diccionario de registro (clave → texto) con acceso tipado.
//!
//! Los valores se guardan como texto, igual que en la tabla de registro. La
//! lectura tipada intenta primero el texto tal cual como string y si el tipo
//! destino no lo acepta, lo interpreta como JSON (`42`, `true`, `null`).

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryDictionary {
    values: BTreeMap<String, Option<String>>,
}

impl RegistryDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_deref())
    }

    pub fn set_raw(&mut self, key: impl Into<String>, value: Option<String>) {
        self.values.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Option<String>> {
        self.values.remove(key)
    }

    /// Lectura tipada; `default` si la clave no existe o no convierte a `T`.
    pub fn get_value<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.values.get(key) {
            Some(raw) => decode(raw.as_deref()).unwrap_or(default),
            None => default,
        }
    }

    /// Escritura tipada. Los strings se guardan sin comillas; `None`/`null`
    /// se guarda como valor nulo.
    pub fn set_value<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> Result<(), serde_json::Error> {
        let encoded = encode(serde_json::to_value(value)?);
        self.values.insert(key.into(), encoded);
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    /// Pares clave/valor en crudo (orden alfabético).
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn decode<T: DeserializeOwned>(raw: Option<&str>) -> Option<T> {
    let Some(text) = raw else {
        return serde_json::from_value(Value::Null).ok();
    };
    serde_json::from_value::<T>(Value::String(text.to_string())).ok()
                                                                .or_else(|| serde_json::from_str::<T>(text).ok())
}

fn encode(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
