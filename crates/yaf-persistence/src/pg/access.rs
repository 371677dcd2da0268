//! Fachada de acceso a datos sobre un `ConnectionProvider`.
//!
//! Una llamada a `DbFunctions::run` toma una conexión del pool y la comparte
//! (vía `SharedConnection`) entre el contexto de infraestructura y la
//! transacción explícita (`DbTransaction`). El mutex no es reentrante: una
//! operación no debe cerrar la transacción mientras tiene la conexión
//! tomada.

use std::sync::{Arc, Mutex, MutexGuard};

use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::pg::PgConnection;
use log::{debug, warn};

use super::{ConnectionProvider, PgPool, PgPooledConnection, PoolProvider};
use crate::error::PersistenceError;

/// Conexión del pool compartida durante una llamada.
#[derive(Clone)]
pub struct SharedConnection {
    inner: Arc<Mutex<PgPooledConnection>>,
}

impl SharedConnection {
    pub fn new(conn: PgPooledConnection) -> Self {
        Self { inner: Arc::new(Mutex::new(conn)) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, PgPooledConnection>, PersistenceError> {
        self.inner
            .lock()
            .map_err(|_| PersistenceError::TransientIo("connection mutex poisoned".into()))
    }

    /// Ejecuta `f` con acceso exclusivo a la conexión.
    pub fn with<T, F>(&self, f: F) -> Result<T, PersistenceError>
        where F: FnOnce(&mut PgConnection) -> Result<T, PersistenceError>
    {
        let mut guard = self.lock()?;
        f(&mut **guard)
    }

    /// `true` si la conexión tiene una transacción abierta (a cualquier nivel).
    pub fn in_transaction(&self) -> Result<bool, PersistenceError> {
        self.with(|conn| {
                let depth = AnsiTransactionManager::transaction_manager_status_mut(conn).transaction_depth()?;
                Ok(depth.is_some())
            })
    }
}

impl std::fmt::Debug for SharedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedConnection").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

/// Transacción explícita sobre una `SharedConnection`.
///
/// Si se descarta abierta, se revierte.
#[derive(Debug)]
pub struct DbTransaction {
    connection: SharedConnection,
    state: Mutex<TransactionState>,
}

impl DbTransaction {
    pub fn begin(connection: SharedConnection) -> Result<Self, PersistenceError> {
        connection.with(|conn| AnsiTransactionManager::begin_transaction(conn).map_err(PersistenceError::from))?;
        debug!("transaction:begin");
        Ok(Self { connection,
                  state: Mutex::new(TransactionState::Open) })
    }

    pub fn connection(&self) -> &SharedConnection {
        &self.connection
    }

    pub fn state(&self) -> TransactionState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == TransactionState::Open
    }

    pub fn commit(&self) -> Result<(), PersistenceError> {
        self.finish(TransactionState::Committed)
    }

    pub fn rollback(&self) -> Result<(), PersistenceError> {
        self.finish(TransactionState::RolledBack)
    }

    fn finish(&self, target: TransactionState) -> Result<(), PersistenceError> {
        let mut state = self.state
                            .lock()
                            .map_err(|_| PersistenceError::TransientIo("transaction state poisoned".into()))?;
        if *state != TransactionState::Open {
            return Err(PersistenceError::InvalidArgument(format!("transaction already {:?}", *state)));
        }
        self.connection.with(|conn| {
                           let done = match target {
                               TransactionState::Committed => AnsiTransactionManager::commit_transaction(conn),
                               _ => AnsiTransactionManager::rollback_transaction(conn),
                           };
                           done.map_err(PersistenceError::from)
                       })?;
        *state = target;
        debug!("transaction:{target:?}");
        Ok(())
    }
}

impl Drop for DbTransaction {
    fn drop(&mut self) {
        if self.is_open() {
            if let Err(e) = self.rollback() {
                warn!("transaction:rollback on drop failed err={e:?}");
            }
        }
    }
}

/// Fachada de acceso: entrega conexiones compartidas.
pub struct DbAccess {
    provider: Box<dyn ConnectionProvider>,
}

impl DbAccess {
    pub fn new<P: ConnectionProvider>(provider: P) -> Self {
        Self { provider: Box::new(provider) }
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self::new(PoolProvider { pool })
    }

    /// Un único checkout; el error del pool se propaga tal cual.
    pub fn connection(&self) -> Result<SharedConnection, PersistenceError> {
        self.provider.connection().map(SharedConnection::new)
    }

    /// Conexión nueva con una transacción ya abierta.
    pub fn begin(&self) -> Result<DbTransaction, PersistenceError> {
        DbTransaction::begin(self.connection()?)
    }
}

impl std::fmt::Debug for DbAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbAccess").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ExhaustedPool {
        calls: Arc<AtomicUsize>,
    }

    impl ConnectionProvider for ExhaustedPool {
        fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(PersistenceError::TransientIo("pool error: timed out waiting for connection".into()))
        }
    }

    #[test]
    fn checkout_failure_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let access = DbAccess::new(ExhaustedPool { calls: Arc::clone(&calls) });
        let err = access.connection().unwrap_err();
        assert!(matches!(err, PersistenceError::TransientIo(_)), "{err:?}");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(access.begin().is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
