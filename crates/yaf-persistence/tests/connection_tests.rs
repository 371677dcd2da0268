//! Pruebas básicas de configuración, pool y migraciones (requiere DATABASE_URL).


use diesel::connection::SimpleConnection;
use yaf_persistence::migrations::run_pending_migrations;
use yaf_persistence::DbAccess;

use test_support::with_pool;

#[test]
fn pool_hands_out_working_connections() {
    let ran = with_pool(|pool| {
        let mut conn = pool.get().expect("conn");
        conn.batch_execute("SELECT 1;").expect("select 1");
    });
    if ran.is_none() {
        eprintln!("DATABASE_URL no definido: omitiendo test");
    }
}

#[test]
fn migrations_are_idempotent() {
    with_pool(|pool| {
        let mut conn = pool.get().expect("conn");
        // build_pool ya aplicó todo
        assert_eq!(run_pending_migrations(&mut conn).expect("migrations"), 0);
    });
}

#[test]
fn transaction_rolls_back_when_dropped_open() {
    with_pool(|pool| {
        let access = DbAccess::from_pool(pool.clone());
        let tx = access.begin().expect("begin");
        assert!(tx.connection().in_transaction().expect("state"));
        let conn = tx.connection().clone();
        drop(tx);
        assert!(!conn.in_transaction().expect("state"));
    });
}

#[test]
fn commit_twice_is_rejected() {
    with_pool(|pool| {
        let access = DbAccess::from_pool(pool.clone());
        let tx = access.begin().expect("begin");
        tx.commit().expect("commit");
        assert!(!tx.is_open());
        assert!(tx.commit().is_err());
        assert!(tx.rollback().is_err());
    });
}
