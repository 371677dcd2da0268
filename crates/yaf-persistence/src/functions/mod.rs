//! Fachada de funciones de base de datos.
//!
//! `DbFunctions::run` arma el contexto de infraestructura de una llamada
//! (conexión, transacción, tipo de función, fachada de acceso), recorre la
//! cadena de backends y cierra la transacción según el resultado.

pub mod pg_functions;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, error, warn};
use yaf_core::{ArgumentBag, DispatchOutcome, FunctionChain, InfraContext, NameMatching, OpValue, TypeTag};

use crate::config::DbConfig;
use crate::error::PersistenceError;
use crate::pg::{build_pool, DbAccess, DbTransaction, PgPool};

pub const DB_CONNECTION: TypeTag = TypeTag::of("DbConnection");
pub const DB_TRANSACTION: TypeTag = TypeTag::of("DbTransaction");
pub const DB_FUNCTION_TYPE: TypeTag = TypeTag::of("DbFunctionType");
pub const DB_ACCESS: TypeTag = TypeTag::of("DbAccess");

/// Forma de resultado que espera el caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DbFunctionType {
    #[default]
    Scalar,
    Query,
    DataTable,
    DataSet,
    Reader,
}

impl DbFunctionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbFunctionType::Scalar => "scalar",
            DbFunctionType::Query => "query",
            DbFunctionType::DataTable => "datatable",
            DbFunctionType::DataSet => "dataset",
            DbFunctionType::Reader => "reader",
        }
    }
}

impl FromStr for DbFunctionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scalar" => Ok(DbFunctionType::Scalar),
            "query" => Ok(DbFunctionType::Query),
            "datatable" => Ok(DbFunctionType::DataTable),
            "dataset" => Ok(DbFunctionType::DataSet),
            "reader" => Ok(DbFunctionType::Reader),
            other => Err(format!("unknown function type '{other}'")),
        }
    }
}

impl fmt::Display for DbFunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct DbFunctions {
    access: Arc<DbAccess>,
    chain: FunctionChain<PersistenceError>,
}

impl DbFunctions {
    pub fn new(access: DbAccess, chain: FunctionChain<PersistenceError>) -> Self {
        Self { access: Arc::new(access),
               chain }
    }

    /// Fachada con el backend Postgres como único eslabón.
    pub fn postgres(pool: PgPool, name_matching: NameMatching) -> Result<Self, PersistenceError> {
        let chain = FunctionChain::new().with(Box::new(pg_functions::dispatcher(name_matching)?));
        Ok(Self::new(DbAccess::from_pool(pool), chain))
    }

    /// Construye pool (con migraciones) y fachada desde la configuración.
    pub fn from_config(cfg: &DbConfig) -> Result<Self, PersistenceError> {
        let pool = build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)?;
        Self::postgres(pool, cfg.name_matching)
    }

    pub fn access(&self) -> &Arc<DbAccess> {
        &self.access
    }

    pub fn chain(&self) -> &FunctionChain<PersistenceError> {
        &self.chain
    }

    pub fn is_supported(&self, operation: &str) -> bool {
        self.chain.is_supported(operation)
    }

    pub fn supported_names(&self) -> BTreeSet<String> {
        self.chain.supported_names()
    }

    /// Ejecuta `operation`.
    ///
    /// Sin backend que la soporte devuelve `NotSupported` sin tocar el pool.
    /// Con `use_transaction` abre una transacción antes de despachar; se
    /// confirma si la operación termina bien y se revierte si falla.
    pub fn run(&self,
               kind: DbFunctionType,
               operation: &str,
               args: &ArgumentBag,
               use_transaction: bool)
               -> Result<DispatchOutcome, PersistenceError> {
        if !self.chain.is_supported(operation) {
            debug!("run '{operation}': no backend supports it");
            return Ok(DispatchOutcome::NotSupported);
        }
        let connection = self.access.connection()?;
        let transaction = if use_transaction {
            Some(Arc::new(DbTransaction::begin(connection.clone())?))
        } else {
            None
        };
        let tx_value = transaction.as_ref().map_or(OpValue::Null, |tx| OpValue::shared(Arc::clone(tx)));
        let infra = InfraContext::new().with(DB_CONNECTION, OpValue::handle(connection))
                                       .with(DB_TRANSACTION, tx_value)
                                       .with(DB_FUNCTION_TYPE, OpValue::handle(kind))
                                       .with(DB_ACCESS, OpValue::shared(Arc::clone(&self.access)));

        let result = self.chain.execute(operation, &infra, args);
        drop(infra);

        if let Some(tx) = transaction {
            match &result {
                Ok(_) if tx.is_open() => tx.commit()?,
                Ok(_) => debug!("run '{operation}': transaction closed by the operation"),
                Err(e) => {
                    warn!("run '{operation}' failed, rolling back err={e:?}");
                    if tx.is_open() {
                        if let Err(rb) = tx.rollback() {
                            error!("run '{operation}': rollback failed err={rb:?}");
                        }
                    }
                }
            }
        }
        result
    }

    /// Atajo: operación escalar sin transacción.
    pub fn scalar(&self, operation: &str, args: &ArgumentBag) -> Result<DispatchOutcome, PersistenceError> {
        self.run(DbFunctionType::Scalar, operation, args, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_type_parses_case_insensitively() {
        assert_eq!("DataTable".parse::<DbFunctionType>(), Ok(DbFunctionType::DataTable));
        assert_eq!("reader".parse::<DbFunctionType>(), Ok(DbFunctionType::Reader));
        assert!("cursor".parse::<DbFunctionType>().is_err());
        assert_eq!(DbFunctionType::DataSet.to_string(), "dataset");
    }

    #[test]
    fn infra_tags_are_opaque() {
        for tag in [DB_CONNECTION, DB_TRANSACTION, DB_FUNCTION_TYPE, DB_ACCESS] {
            assert!(!tag.is_primitive(), "{tag}");
        }
    }
}
