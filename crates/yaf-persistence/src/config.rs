//! Carga de configuración de conexión desde variables de entorno.
//! Usa convención `DATABASE_URL`, parámetros opcionales de pool y la
//! política de matching de nombres del binder (`YAF_PARAM_NAME_MATCHING`).

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use yaf_core::NameMatching;

use crate::error::PersistenceError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub name_matching: NameMatching,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, PersistenceError> {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero leyendo de una función arbitraria (tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PersistenceError>
        where F: Fn(&str) -> Option<String>
    {
        let url = lookup("DATABASE_URL").ok_or_else(|| PersistenceError::Config("DATABASE_URL no definido".into()))?;
        let min_connections = lookup("DATABASE_MIN_CONNECTIONS").and_then(|v| v.parse().ok()).unwrap_or(2);
        let max_connections = lookup("DATABASE_MAX_CONNECTIONS").and_then(|v| v.parse().ok()).unwrap_or(16);
        let name_matching = match lookup("YAF_PARAM_NAME_MATCHING") {
            Some(raw) => raw.parse::<NameMatching>().map_err(PersistenceError::Config)?,
            None => NameMatching::default(),
        };
        if min_connections > max_connections {
            return Err(PersistenceError::Config(format!("DATABASE_MIN_CONNECTIONS ({min_connections}) > DATABASE_MAX_CONNECTIONS ({max_connections})")));
        }
        Ok(Self { url,
                  min_connections,
                  max_connections,
                  name_matching })
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
