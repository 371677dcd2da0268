//! Conexiones Postgres (Diesel + r2d2).
//!
//! - `PgPool`: pool r2d2; `build_pool` lo construye y corre las migraciones
//!   pendientes una sola vez.
//! - `ConnectionProvider`: abstracción para obtener conexiones (pool real en
//!   producción, proveedores simulados en tests).
//! - `with_retry`: reintento con backoff corto para errores transitorios.
//! - `access`: fachada `DbAccess`, conexión compartida y transacción explícita.

pub mod access;

use std::time::Duration;

use diesel::pg::PgConnection;
use diesel::r2d2::ConnectionManager;
use log::{debug, warn};

use crate::config::DbConfig;
use crate::error::{is_retryable, PersistenceError};
use crate::migrations::run_pending_migrations;

pub use access::{DbAccess, DbTransaction, SharedConnection, TransactionState};

/// Alias de tipo para el pool r2d2 de conexiones Postgres.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub type PgPooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Espera máxima de un checkout antes de fallar con `TransientIo`.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Proveedor abstracto de conexiones.
///
/// Contrato: devuelve una conexión válida o `PersistenceError::TransientIo`
/// (o equivalente) si no hay conexión disponible.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError>;
}

/// Implementación concreta de `ConnectionProvider` respaldada por un `PgPool`.
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Retry simple con backoff lineal muy pequeño (hasta 3 reintentos).
///
/// Backoff: 15ms, 30ms, 45ms. Se emite `warn!` por intento. Sólo repite la
/// unidad de trabajo provista por `f`, que debe ser idempotente; el checkout
/// del pool no se envuelve aparte porque ya espera `CONNECTION_TIMEOUT`.
pub fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms",
                      attempts + 1,
                      e,
                      delay_ms);
                std::thread::sleep(Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

/// Construye el pool sin tocar el esquema.
pub fn connect_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_min = min_size.max(1);
    let validated_max = max_size.max(1);
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), ajustando min=max");
    }
    let final_min = validated_min.min(validated_max);
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(final_min))
                                    .max_size(validated_max)
                                    .connection_timeout(CONNECTION_TIMEOUT)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    debug!("pool ready min_idle={final_min} max_size={validated_max} timeout={CONNECTION_TIMEOUT:?}");
    Ok(pool)
}

/// Construye el pool y aplica las migraciones pendientes (primer checkout).
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let pool = connect_pool(database_url, min_size, max_size)?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Helper de desarrollo: carga `.env`, lee configuración y construye un pool
/// ya migrado.
pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    let cfg = DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn retry_stops_after_three_retries() {
        let calls = Cell::new(0);
        let out: Result<(), _> = with_retry(|| {
            calls.set(calls.get() + 1);
            Err(PersistenceError::TransientIo("down".into()))
        });
        assert!(out.is_err());
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn retry_does_not_repeat_permanent_errors() {
        let calls = Cell::new(0);
        let out: Result<(), _> = with_retry(|| {
            calls.set(calls.get() + 1);
            Err(PersistenceError::InvalidArgument("bad".into()))
        });
        assert!(matches!(out, Err(PersistenceError::InvalidArgument(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn retry_returns_first_success() {
        let calls = Cell::new(0);
        let out = with_retry(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 2 {
                Err(PersistenceError::SerializationConflict)
            } else {
                Ok(7)
            }
        });
        assert_eq!(out.expect("value"), 7);
        assert_eq!(calls.get(), 2);
    }
}
