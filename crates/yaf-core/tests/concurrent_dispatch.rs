//! El registro es de sólo lectura tras construirse: varios hilos pueden
//! despachar contra el mismo `Dispatcher` sin sincronización externa.

use std::sync::Arc;
use std::thread;

use yaf_core::{operation, ArgumentBag, DispatchError, Dispatcher, InfraContext, OpValue, Operation, TypeTag};

#[test]
fn parallel_executions_are_independent() {
    let ops: Vec<Operation<DispatchError>> =
        vec![operation!(Mul(a: TypeTag::INT, b: TypeTag::INT) => |args| Ok(OpValue::Int(args.int(0)? * args.int(1)?)))];
    let dispatcher: Arc<Dispatcher> = Arc::new(Dispatcher::from_source(&ops).expect("dispatcher"));

    let handles: Vec<_> = (0..8i64).map(|i| {
                                       let d = Arc::clone(&dispatcher);
                                       thread::spawn(move || {
                                           let args = ArgumentBag::new().named("b", i).positional(10);
                                           d.execute("mul", &InfraContext::new(), &args)
                                            .expect("mul")
                                            .into_value()
                                       })
                                   })
                                   .collect();

    let mut results: Vec<i64> = handles.into_iter()
                                       .map(|h| match h.join().expect("thread") {
                                           Some(OpValue::Int(v)) => v,
                                           other => panic!("unexpected {other:?}"),
                                       })
                                       .collect();
    results.sort_unstable();
    assert_eq!(results, (0..8).map(|i| i * 10).collect::<Vec<i64>>());
}
