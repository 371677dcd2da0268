//! Operaciones Postgres despachadas a través de `DbFunctions` (requiere
//! DATABASE_URL; sin él los tests se omiten).


use std::sync::Barrier;
use std::thread;

use diesel::RunQueryDsl;
use yaf_core::{operation, ArgumentBag, DispatchOutcome, Dispatcher, FunctionChain, NameMatching, OpValue, Operation,
               TypeTag};
use yaf_persistence::functions::pg_functions;
use yaf_persistence::{DbAccess, DbFunctionType, DbFunctions, PersistenceError, SharedConnection, DB_CONNECTION};

use test_support::{unique_key, with_functions, with_pool};

#[test]
fn unknown_operation_does_not_touch_the_pool() {
    with_functions(|f| {
        let out = f.scalar("does_not_exist", &ArgumentBag::new()).expect("soft miss");
        assert_eq!(out, DispatchOutcome::NotSupported);
    });
}

#[test]
fn server_introspection() {
    with_functions(|f| {
        match f.scalar("DB_VERSION", &ArgumentBag::new()).expect("version").into_value() {
            Some(OpValue::Text(v)) => assert!(!v.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
        match f.scalar("db_size", &ArgumentBag::new()).expect("size").into_value() {
            Some(OpValue::Int(bytes)) => assert!(bytes > 0),
            other => panic!("unexpected {other:?}"),
        }
        let installed = f.scalar("is_forum_installed", &ArgumentBag::new()).expect("installed");
        assert_eq!(installed.into_value(), Some(OpValue::Bool(true)));
    });
}

#[test]
fn run_sql_reports_affected_rows() {
    with_functions(|f| {
        let args = ArgumentBag::new().positional("SELECT 1");
        let out = f.run(DbFunctionType::Scalar, "run_sql", &args, true).expect("run_sql");
        assert_eq!(out.into_value(), Some(OpValue::Int(1)));
    });
}

#[test]
fn failing_operation_rolls_back_its_transaction() {
    with_pool(|pool| {
        let failing: Vec<Operation<PersistenceError>> =
            vec![operation!(insert_then_fail(conn: DB_CONNECTION, name: TypeTag::TEXT) => |args| {
                     let conn = args.handle::<SharedConnection>(0)?;
                     let name = args.text(1)?;
                     conn.with(|c| {
                             diesel::sql_query("INSERT INTO yaf_registry (name, value) VALUES ($1, 'x')")
                                 .bind::<diesel::sql_types::Text, _>(name)
                                 .execute(c)
                                 .map_err(PersistenceError::from)
                         })?;
                     Err(PersistenceError::InvalidArgument("boom".into()))
                 })];
        let custom = Dispatcher::from_source(&failing).expect("custom").with_sort_order(10);
        let chain = FunctionChain::new().with(Box::new(custom))
                                        .with(Box::new(pg_functions::dispatcher(NameMatching::default()).expect("pg")));
        let f = DbFunctions::new(DbAccess::from_pool(pool.clone()), chain);

        let key = unique_key("rollback");
        let args = ArgumentBag::new().named("name", key.as_str());
        assert!(f.run(DbFunctionType::Scalar, "insert_then_fail", &args, true).is_err());

        let list = f.scalar("registry_list", &ArgumentBag::new().named("board_id", OpValue::Null))
                    .expect("list")
                    .into_value()
                    .expect("handled");
        assert!(list.to_json().get(&key).is_none());
    });
}

#[test]
fn vacuum_is_rejected_inside_a_transaction() {
    with_functions(|f| {
        let err = f.run(DbFunctionType::Scalar, "db_shrink", &ArgumentBag::new(), true).unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidArgument(_)), "{err:?}");
        let ok = f.run(DbFunctionType::Scalar, "db_shrink", &ArgumentBag::new(), false).expect("vacuum");
        assert_eq!(ok.into_value(), Some(OpValue::Null));
    });
}

#[test]
fn registry_save_upserts_per_level() {
    with_functions(|f| {
        let key = unique_key("upsert");
        let save = |value: &str, board: OpValue| {
            let args = ArgumentBag::new().named("name", key.as_str())
                                         .named("value", value)
                                         .named("board_id", board);
            f.run(DbFunctionType::Scalar, "registry_save", &args, true).expect("save")
        };
        assert_eq!(save("1", OpValue::Null).into_value(), Some(OpValue::Int(1)));
        assert_eq!(save("2", OpValue::Null).into_value(), Some(OpValue::Int(1)));
        assert_eq!(save("board", OpValue::Int(7)).into_value(), Some(OpValue::Int(1)));

        let global = f.scalar("registry_list", &ArgumentBag::new().positional(OpValue::Null))
                      .expect("list")
                      .into_value()
                      .expect("handled")
                      .to_json();
        assert_eq!(global[key.as_str()], "2");
        let board = f.scalar("registry_list", &ArgumentBag::new().positional(7))
                     .expect("list")
                     .into_value()
                     .expect("handled")
                     .to_json();
        assert_eq!(board[key.as_str()], "board");
    });
}

#[test]
fn concurrent_first_saves_of_a_key_both_succeed() {
    with_functions(|f| {
        for round in 0..5 {
            let key = unique_key(&format!("race{round}"));
            for board in [OpValue::Null, OpValue::Int(11)] {
                let barrier = Barrier::new(2);
                let results: Vec<Result<DispatchOutcome, PersistenceError>> = thread::scope(|s| {
                    let handles: Vec<_> = ["a", "b"].into_iter()
                                                    .map(|value| {
                                                        let (key, board, barrier) = (&key, board.clone(), &barrier);
                                                        s.spawn(move || {
                                                             let args = ArgumentBag::new().named("name", key.as_str())
                                                                                          .named("value", value)
                                                                                          .named("board_id", board);
                                                             barrier.wait();
                                                             f.run(DbFunctionType::Scalar, "registry_save", &args, true)
                                                         })
                                                    })
                                                    .collect();
                    handles.into_iter().map(|h| h.join().expect("thread")).collect()
                });
                for result in results {
                    assert_eq!(result.expect("concurrent save").into_value(), Some(OpValue::Int(1)));
                }

                let listed = f.scalar("registry_list", &ArgumentBag::new().positional(board.clone()))
                              .expect("list")
                              .into_value()
                              .expect("handled")
                              .to_json();
                let stored = listed[key.as_str()].as_str().expect("stored value");
                assert!(stored == "a" || stored == "b", "round {round}: {stored}");
            }
        }
    });
}
