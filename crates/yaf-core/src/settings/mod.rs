//! Registro de configuración genérico (`get(key, default)` / `set(key, value)`)
//! con override por board.

pub mod dictionary;
pub mod registry_override;

pub use dictionary::RegistryDictionary;
pub use registry_override::{RegistryLevel, RegistryOverride};
