use serde::de::DeserializeOwned;
use serde::Serialize;

use super::dictionary::RegistryDictionary;

/// Registro global con un diccionario de override por board.
///
/// - `get`: si `default_get_override` está activo y el board define la clave,
///   se lee del board; si no, del registro global.
/// - `set`: si `default_set_override` está activo se escribe en el board; si
///   no, en el global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOverride {
    pub base: RegistryDictionary,
    pub board: RegistryDictionary,
    pub default_get_override: bool,
    pub default_set_override: bool,
}

impl Default for RegistryOverride {
    fn default() -> Self {
        Self { base: RegistryDictionary::new(),
               board: RegistryDictionary::new(),
               default_get_override: true,
               default_set_override: false }
    }
}

/// Nivel en el que vive (o se escribe) un valor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryLevel {
    Global,
    Board,
}

impl RegistryOverride {
    pub fn new(base: RegistryDictionary, board: RegistryDictionary) -> Self {
        Self { base,
               board,
               ..Self::default() }
    }

    /// Nivel del que se leería `key`.
    pub fn level_of(&self, key: &str) -> RegistryLevel {
        if self.default_get_override && self.board.contains(key) {
            RegistryLevel::Board
        } else {
            RegistryLevel::Global
        }
    }

    pub fn write_level(&self) -> RegistryLevel {
        if self.default_set_override {
            RegistryLevel::Board
        } else {
            RegistryLevel::Global
        }
    }

    pub fn get_value<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.level_of(key) {
            RegistryLevel::Board => self.board.get_value(key, default),
            RegistryLevel::Global => self.base.get_value(key, default),
        }
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        match self.level_of(key) {
            RegistryLevel::Board => self.board.raw(key),
            RegistryLevel::Global => self.base.raw(key),
        }
    }

    /// Escribe `value` y devuelve el nivel donde quedó.
    pub fn set_value<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> Result<RegistryLevel, serde_json::Error> {
        let level = self.write_level();
        match level {
            RegistryLevel::Board => self.board.set_value(key, value)?,
            RegistryLevel::Global => self.base.set_value(key, value)?,
        }
        Ok(level)
    }
}
