//! Registro de configuración del foro persistido en `yaf_registry`.
//!
//! Lecturas y escrituras pasan por el despachador (`registry_list` /
//! `registry_save`), igual que cualquier otra función de base de datos. Las
//! dos son idempotentes, así que cada llamada completa se repite con
//! `with_retry` ante errores transitorios.

use serde::Serialize;
use serde_json::Value;
use yaf_core::{ArgumentBag, DispatchOutcome, OpValue, RegistryDictionary, RegistryLevel, RegistryOverride};

use crate::error::PersistenceError;
use crate::functions::{DbFunctionType, DbFunctions};
use crate::pg::with_retry;

/// Convierte el objeto JSON de `registry_list` (nombre → valor) en diccionario.
pub fn dictionary_from_json(value: &Value) -> Result<RegistryDictionary, PersistenceError> {
    let Value::Object(map) = value else {
        return Err(PersistenceError::InvalidArgument(format!("registry_list: expected object, got {value}")));
    };
    let mut dict = RegistryDictionary::new();
    for (name, raw) in map {
        let text = match raw {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        };
        dict.set_raw(name.clone(), text);
    }
    Ok(dict)
}

pub struct BoardSettingsStore<'a> {
    functions: &'a DbFunctions,
}

impl<'a> BoardSettingsStore<'a> {
    pub fn new(functions: &'a DbFunctions) -> Self {
        Self { functions }
    }

    fn handled(outcome: DispatchOutcome, operation: &str) -> Result<OpValue, PersistenceError> {
        outcome.into_value()
               .ok_or_else(|| PersistenceError::NotSupported(operation.to_string()))
    }

    /// Diccionario de un nivel: `None` = global, `Some(id)` = board.
    pub fn load_dictionary(&self, board: Option<i32>) -> Result<RegistryDictionary, PersistenceError> {
        let args = ArgumentBag::new().named("board_id", board.map(i64::from));
        let outcome = with_retry(|| self.functions.run(DbFunctionType::DataTable, "registry_list", &args, false))?;
        dictionary_from_json(&Self::handled(outcome, "registry_list")?.to_json())
    }

    /// Registro global más el override del board indicado.
    pub fn load(&self, board: i32) -> Result<RegistryOverride, PersistenceError> {
        let base = self.load_dictionary(None)?;
        let board = self.load_dictionary(Some(board))?;
        Ok(RegistryOverride::new(base, board))
    }

    /// Guarda un valor crudo en el nivel indicado.
    pub fn save(&self, key: &str, value: Option<&str>, board: Option<i32>) -> Result<i64, PersistenceError> {
        let args = ArgumentBag::new().named("name", key)
                                     .named("value", value)
                                     .named("board_id", board.map(i64::from));
        let outcome = with_retry(|| self.functions.run(DbFunctionType::Scalar, "registry_save", &args, true))?;
        match Self::handled(outcome, "registry_save")? {
            OpValue::Int(n) => Ok(n),
            other => Err(PersistenceError::Unknown(format!("registry_save returned {}", other.kind_name()))),
        }
    }

    /// Escribe `value` en `registry` (según `default_set_override`) y lo
    /// persiste en el mismo nivel.
    pub fn set_value<T: Serialize>(&self,
                                   registry: &mut RegistryOverride,
                                   board: i32,
                                   key: &str,
                                   value: T)
                                   -> Result<RegistryLevel, PersistenceError> {
        let level = registry.set_value(key, value)?;
        let (raw, target) = match level {
            RegistryLevel::Global => (registry.base.raw(key), None),
            RegistryLevel::Board => (registry.board.raw(key), Some(board)),
        };
        self.save(key, raw, target)?;
        Ok(level)
    }
}
