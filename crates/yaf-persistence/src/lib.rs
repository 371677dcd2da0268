//! yaf-persistence
//!
//! Backend Postgres (Diesel + r2d2) del despachador de `yaf-core`.
//!
//! Módulos:
//! - `config`: carga de configuración desde .env.
//! - `pg`: pool, reintentos, conexión compartida y transacciones explícitas.
//! - `functions`: fachada `DbFunctions` y tabla de operaciones Postgres.
//! - `settings`: registro de configuración global / por board.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `schema`: tablas Diesel declaradas para compilar queries.

pub mod config;
pub mod error;
pub mod functions;
pub mod migrations;
pub mod pg;
pub mod schema;
pub mod settings;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use functions::{DbFunctionType, DbFunctions, DB_ACCESS, DB_CONNECTION, DB_FUNCTION_TYPE, DB_TRANSACTION};
pub use pg::{build_dev_pool_from_env, build_pool, ConnectionProvider, DbAccess, DbTransaction, PgPool, PoolProvider,
             SharedConnection};
pub use settings::BoardSettingsStore;
