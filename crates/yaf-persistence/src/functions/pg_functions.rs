//! Funciones específicas de Postgres.
//!
//! Cada operación recibe la conexión (y, si la declara, la transacción) por
//! tipo desde el contexto de infraestructura; el resto de parámetros sale de
//! la bolsa del caller por nombre o posición.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool, Int4, Nullable, Text};
use log::debug;
use serde_json::{Map, Value};
use yaf_core::{operation, BoundArguments, Dispatcher, NameMatching, OpValue, Operation, OperationSource, TypeTag};

use super::{DbFunctionType, DB_CONNECTION, DB_FUNCTION_TYPE, DB_TRANSACTION};
use crate::error::PersistenceError;
use crate::pg::{DbTransaction, SharedConnection};
use crate::schema::yaf_registry;

/// Orden de la cadena para el backend Postgres.
pub const SORT_ORDER: i32 = 1000;

#[derive(QueryableByName, Debug)]
struct VersionRow {
    #[diesel(sql_type = Text)]
    version: String,
}

#[derive(QueryableByName, Debug)]
struct SizeRow {
    #[diesel(sql_type = BigInt)]
    bytes: i64,
}

#[derive(QueryableByName, Debug)]
struct InstalledRow {
    #[diesel(sql_type = Bool)]
    installed: bool,
}

const UPSERT_GLOBAL: &str = "INSERT INTO yaf_registry (name, value) VALUES ($1, $2) \
                             ON CONFLICT (name) WHERE board_id IS NULL \
                             DO UPDATE SET value = EXCLUDED.value";

const UPSERT_BOARD: &str = "INSERT INTO yaf_registry (name, value, board_id) VALUES ($1, $2, $3) \
                            ON CONFLICT (name, board_id) WHERE board_id IS NOT NULL \
                            DO UPDATE SET value = EXCLUDED.value";

/// Origen de operaciones del backend Postgres.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgSpecificFunctions;

impl OperationSource<PersistenceError> for PgSpecificFunctions {
    fn source_name(&self) -> &str {
        "postgres"
    }

    fn operations(&self) -> Vec<Operation<PersistenceError>> {
        operations()
    }
}

pub fn operations() -> Vec<Operation<PersistenceError>> {
    vec![operation!(ping() => |_args| Ok(OpValue::Bool(true))),
         operation!(db_version(conn: DB_CONNECTION) => db_version),
         operation!(db_size(conn: DB_CONNECTION) => db_size),
         operation!(is_forum_installed(conn: DB_CONNECTION) => is_forum_installed),
         operation!(full_text_supported(function_type: DB_FUNCTION_TYPE) => full_text_supported),
         operation!(run_sql(conn: DB_CONNECTION, sql: TypeTag::TEXT) => run_sql),
         operation!(db_shrink(conn: DB_CONNECTION, tx: DB_TRANSACTION) => db_shrink),
         operation!(reindex_db(conn: DB_CONNECTION) => reindex_db),
         operation!(registry_list(conn: DB_CONNECTION, board_id: TypeTag::INT) => registry_list),
         operation!(registry_save(conn: DB_CONNECTION,
                                  name: TypeTag::TEXT,
                                  value: TypeTag::TEXT,
                                  board_id: TypeTag::INT) => registry_save),]
}

/// Despachador Postgres listo para encadenar.
pub fn dispatcher(name_matching: NameMatching) -> Result<Dispatcher<PersistenceError>, PersistenceError> {
    Ok(Dispatcher::from_source(&PgSpecificFunctions)?.with_name_matching(name_matching)
                                                     .with_sort_order(SORT_ORDER))
}

fn db_version(args: BoundArguments) -> Result<OpValue, PersistenceError> {
    let conn = args.handle::<SharedConnection>(0)?;
    let row: VersionRow = conn.with(|c| {
                                  diesel::sql_query("SELECT current_setting('server_version') AS version").get_result(c)
                                                                                                           .map_err(PersistenceError::from)
                              })?;
    Ok(OpValue::Text(row.version))
}

fn db_size(args: BoundArguments) -> Result<OpValue, PersistenceError> {
    let conn = args.handle::<SharedConnection>(0)?;
    let row: SizeRow = conn.with(|c| {
                               diesel::sql_query("SELECT pg_database_size(current_database()) AS bytes").get_result(c)
                                                                                                        .map_err(PersistenceError::from)
                           })?;
    Ok(OpValue::Int(row.bytes))
}

fn is_forum_installed(args: BoundArguments) -> Result<OpValue, PersistenceError> {
    let conn = args.handle::<SharedConnection>(0)?;
    let row: InstalledRow =
        conn.with(|c| {
                diesel::sql_query("SELECT to_regclass('public.yaf_registry') IS NOT NULL AS installed").get_result(c)
                                                                                                       .map_err(PersistenceError::from)
            })?;
    Ok(OpValue::Bool(row.installed))
}

fn full_text_supported(args: BoundArguments) -> Result<OpValue, PersistenceError> {
    let kind = args.handle::<DbFunctionType>(0)?;
    debug!("full_text_supported kind={kind}");
    Ok(OpValue::Bool(true))
}

fn run_sql(args: BoundArguments) -> Result<OpValue, PersistenceError> {
    let conn = args.handle::<SharedConnection>(0)?;
    let sql = args.text(1)?;
    if sql.trim().is_empty() {
        return Err(PersistenceError::InvalidArgument("run_sql: empty statement".into()));
    }
    let affected = conn.with(|c| diesel::sql_query(sql).execute(c).map_err(PersistenceError::from))?;
    debug!("run_sql affected={affected}");
    Ok(OpValue::Int(affected as i64))
}

/// VACUUM y REINDEX SCHEMA no pueden ejecutarse dentro de un bloque de
/// transacción.
fn reject_in_transaction(conn: &SharedConnection, statement: &str) -> Result<(), PersistenceError> {
    if conn.in_transaction()? {
        return Err(PersistenceError::InvalidArgument(format!("{statement} cannot run inside a transaction")));
    }
    Ok(())
}

fn db_shrink(args: BoundArguments) -> Result<OpValue, PersistenceError> {
    let conn = args.handle::<SharedConnection>(0)?;
    if let Some(tx) = args.opt_handle::<DbTransaction>(1)? {
        if tx.is_open() {
            return Err(PersistenceError::InvalidArgument("VACUUM cannot run inside a transaction".into()));
        }
    }
    reject_in_transaction(&conn, "VACUUM")?;
    conn.with(|c| c.batch_execute("VACUUM").map_err(PersistenceError::from))?;
    Ok(OpValue::Null)
}

fn reindex_db(args: BoundArguments) -> Result<OpValue, PersistenceError> {
    let conn = args.handle::<SharedConnection>(0)?;
    reject_in_transaction(&conn, "REINDEX SCHEMA")?;
    conn.with(|c| c.batch_execute("REINDEX SCHEMA public").map_err(PersistenceError::from))?;
    Ok(OpValue::Null)
}

fn board_id(args: &BoundArguments, index: usize) -> Result<Option<i32>, PersistenceError> {
    args.opt_int(index)?
        .map(|id| i32::try_from(id).map_err(|_| PersistenceError::InvalidArgument(format!("board_id out of range: {id}"))))
        .transpose()
}

fn registry_list(args: BoundArguments) -> Result<OpValue, PersistenceError> {
    let conn = args.handle::<SharedConnection>(0)?;
    let board = board_id(&args, 1)?;
    let rows: Vec<(String, Option<String>)> =
        conn.with(|c| {
                yaf_registry::table.filter(yaf_registry::board_id.is_not_distinct_from(board))
                                   .select((yaf_registry::name, yaf_registry::value))
                                   .order(yaf_registry::name.asc())
                                   .load(c)
                                   .map_err(PersistenceError::from)
            })?;
    debug!("registry_list board={board:?} count={}", rows.len());
    let map: Map<String, Value> = rows.into_iter()
                                      .map(|(name, value)| (name, value.map_or(Value::Null, Value::String)))
                                      .collect();
    Ok(OpValue::Json(Value::Object(map)))
}

fn registry_save(args: BoundArguments) -> Result<OpValue, PersistenceError> {
    let conn = args.handle::<SharedConnection>(0)?;
    let name = args.text(1)?;
    let value = args.opt_text(2)?;
    let board = board_id(&args, 3)?;
    if name.is_empty() {
        return Err(PersistenceError::InvalidArgument("registry_save: empty name".into()));
    }
    // Un único INSERT .. ON CONFLICT por nivel: cada nivel tiene su propio
    // índice único parcial.
    let affected = conn.with(|c| {
                           let upserted = match board {
                               None => diesel::sql_query(UPSERT_GLOBAL).bind::<Text, _>(name)
                                                                       .bind::<Nullable<Text>, _>(value)
                                                                       .execute(c)?,
                               Some(board) => diesel::sql_query(UPSERT_BOARD).bind::<Text, _>(name)
                                                                             .bind::<Nullable<Text>, _>(value)
                                                                             .bind::<Int4, _>(board)
                                                                             .execute(c)?,
                           };
                           Ok(upserted)
                       })?;
    debug!("registry_save name={name} board={board:?} affected={affected}");
    Ok(OpValue::Int(affected as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use yaf_core::{ArgumentBag, BindError, DispatchOutcome, InfraContext};

    #[test]
    fn table_declares_every_postgres_operation() {
        let d = dispatcher(NameMatching::default()).expect("dispatcher");
        let names = d.registry().supported_names();
        for expected in ["ping",
                         "db_version",
                         "db_size",
                         "is_forum_installed",
                         "full_text_supported",
                         "run_sql",
                         "db_shrink",
                         "reindex_db",
                         "registry_list",
                         "registry_save"]
        {
            assert!(names.contains(expected), "missing {expected}");
        }
        assert_eq!(names.len(), 10);
    }

    #[test]
    fn pure_operations_run_without_a_connection() {
        let d = dispatcher(NameMatching::default()).expect("dispatcher");
        let out = d.execute("PING", &InfraContext::new(), &ArgumentBag::new()).expect("ping");
        assert_eq!(out, DispatchOutcome::Handled(OpValue::Bool(true)));

        let infra = InfraContext::new().with(DB_FUNCTION_TYPE, OpValue::handle(DbFunctionType::Scalar));
        let out = d.execute("Full_Text_Supported", &infra, &ArgumentBag::new()).expect("fts");
        assert_eq!(out.into_value(), Some(OpValue::Bool(true)));
    }

    #[test]
    fn function_type_marker_must_be_the_enum() {
        let d = dispatcher(NameMatching::default()).expect("dispatcher");
        let infra = InfraContext::new().with(DB_FUNCTION_TYPE, OpValue::from("scalar"));
        let err = d.execute("full_text_supported", &infra, &ArgumentBag::new()).unwrap_err();
        assert!(matches!(err, PersistenceError::Bind(BindError::TypeMismatch { .. })), "{err:?}");
    }

    #[test]
    fn missing_connection_is_an_arity_error() {
        let d = dispatcher(NameMatching::default()).expect("dispatcher");
        let err = d.execute("db_size", &InfraContext::new(), &ArgumentBag::new()).unwrap_err();
        match err {
            PersistenceError::Bind(BindError::Arity { parameter, position, .. }) => {
                assert_eq!(parameter, "conn");
                assert_eq!(position, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn wrong_connection_kind_is_a_type_mismatch() {
        let d = dispatcher(NameMatching::default()).expect("dispatcher");
        let infra = InfraContext::new().with(DB_CONNECTION, OpValue::from("not a connection"));
        let err = d.execute("db_version", &infra, &ArgumentBag::new()).unwrap_err();
        assert!(matches!(err, PersistenceError::Bind(BindError::TypeMismatch { .. })), "{err:?}");
    }

    #[test]
    fn registry_save_signature_is_ordered() {
        let d = dispatcher(NameMatching::default()).expect("dispatcher");
        let desc = d.registry().lookup("registry_save").expect("desc");
        let names: Vec<&str> = desc.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["conn", "name", "value", "board_id"]);
    }
}
