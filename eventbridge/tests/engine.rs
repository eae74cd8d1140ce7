//! Adapters hosted on the tokio-backed engine.

use eventbridge::{
    Engine, EngineError, EventAdapter, Function, InvocationError, TaskEngine, Value,
    testing::{Gate, Recorder},
};

mod common;
use common::{TIMEOUT, listener_interface};

fn engine() -> TaskEngine {
    common::init_tracing();
    TaskEngine::builder()
        .max_idle_workers(2)
        .worker_name_prefix("test-worker")
        .build()
        .unwrap()
}

/// A function recording the id of the worker it runs on.
fn worker_id_recorder(engine: &TaskEngine, recorder: &Recorder) -> Function {
    let engine = engine.clone();
    let record = recorder.function();
    Function::new(move |_| {
        let id = engine.current_worker().map(|worker| worker.id().0 as i64);
        record.call(&[Value::from(id)])
    })
}

// ============================================================================
// Worker binding
// ============================================================================

#[test]
fn test_lazy_workers_are_released_per_call() {
    let engine = engine();
    let recorder = Recorder::new();
    let adapter = EventAdapter::new(engine.shared(), &listener_interface()).unwrap();

    adapter.add_sync_listener("onTick", recorder.function()).unwrap();
    for i in 0..3 {
        adapter.call("onTick", vec![Value::from(i.to_string())]).unwrap();
    }

    let stats = engine.stats();
    assert_eq!(recorder.count(), 3);
    assert_eq!(stats.acquired, 3);
    assert_eq!(stats.released, 3);
    assert_eq!(stats.workers_created, 1);
}

#[test]
fn test_lazy_worker_released_when_listener_fails() {
    let engine = engine();
    let adapter = EventAdapter::new(engine.shared(), &listener_interface()).unwrap();

    adapter
        .add_sync_listener("onTick", Function::new(|_| Err("nope".into())))
        .unwrap();

    assert!(adapter.call("onTick", vec![Value::from("x")]).is_err());
    let stats = engine.stats();
    assert_eq!(stats.acquired, 1);
    assert_eq!(stats.released, 1);
}

#[test]
fn test_listener_registered_in_worker_stays_bound() {
    let engine = engine();
    let recorder = Recorder::new();
    let adapter = EventAdapter::new(engine.shared(), &listener_interface()).unwrap();

    let registered_in = engine.run_in_worker(|| {
        adapter
            .add_sync_listener("onTick", worker_id_recorder(&engine, &recorder))
            .unwrap();
        engine.current_worker().map(|worker| worker.id().0 as i64)
    });
    assert!(registered_in.is_some());

    adapter.call("onTick", vec![Value::from("a")]).unwrap();
    adapter.call("onTick", vec![Value::from("b")]).unwrap();

    let expected = vec![Value::from(registered_in); 2];
    assert_eq!(
        recorder.calls().into_iter().map(|call| call[0].clone()).collect::<Vec<_>>(),
        expected
    );
    // Only the acquisition made by `run_in_worker`.
    assert_eq!(engine.stats().acquired, 1);
}

#[test]
fn test_bound_async_listener_runs_on_its_worker() {
    let engine = engine();
    let recorder = Recorder::new();
    let adapter = EventAdapter::new(engine.shared(), &listener_interface()).unwrap();

    let registered_in = engine.run_in_worker(|| {
        adapter
            .add_listener("onTick", worker_id_recorder(&engine, &recorder))
            .unwrap();
        engine.current_worker().map(|worker| worker.id().0 as i64)
    });

    adapter.call("onTick", vec![Value::from("a")]).unwrap();

    assert!(recorder.wait_for(1, TIMEOUT));
    assert_eq!(recorder.calls()[0][0], Value::from(registered_in));
}

#[test]
fn test_emit_from_inside_the_bound_worker() {
    let engine = engine();
    let recorder = Recorder::new();
    let adapter = EventAdapter::new(engine.shared(), &listener_interface()).unwrap();

    let result = engine.run_in_worker(|| {
        adapter
            .add_sync_listener("onTick", recorder.function())
            .unwrap();
        adapter.call("onTick", vec![Value::from("nested")])
    });

    assert_eq!(result.unwrap(), Value::Null);
    assert_eq!(recorder.count(), 1);
}

// ============================================================================
// Async dispatch
// ============================================================================

#[test]
fn test_async_listener_does_not_block_emitter() {
    let engine = engine();
    let gate = Gate::new();
    let recorder = Recorder::new();
    let adapter = EventAdapter::new(engine.shared(), &listener_interface()).unwrap();

    adapter.add_listener("onTick", gate.blocker(TIMEOUT)).unwrap();
    adapter.add_listener("onTick", recorder.function()).unwrap();

    let ret = adapter.call("onTick", vec![Value::from("go")]).unwrap();
    assert_eq!(ret, Value::Null);
    assert!(!gate.is_open());

    gate.open();
    assert!(recorder.wait_for(1, TIMEOUT));
    assert_eq!(recorder.calls(), vec![vec![Value::from("go")]]);
}

#[test]
fn test_async_listener_failure_is_swallowed() {
    let engine = engine();
    let gate = Gate::new();
    let adapter = EventAdapter::new(engine.shared(), &listener_interface()).unwrap();

    engine.run_in_worker(|| {
        adapter
            .add_listener("onTick", Function::new(|_| Err("async boom".into())))
            .unwrap();
        adapter.add_listener("onTick", gate.opener()).unwrap();
    });

    assert!(adapter.call("onTick", vec![Value::from("x")]).is_ok());
    assert!(gate.wait(TIMEOUT));
    assert_eq!(engine.stats().jobs_failed, 1);
}

// ============================================================================
// Module references
// ============================================================================

#[test]
fn test_module_reference_listener() {
    let engine = engine();
    let recorder = Recorder::new();
    let adapter = EventAdapter::new(engine.shared(), &listener_interface()).unwrap();

    engine.define("app/events", "onTick", recorder.tagged("v1"));
    adapter
        .add_sync_listener("onTick", Value::module_ref("app/events", "onTick"))
        .unwrap();
    adapter.call("onTick", vec![Value::from("a")]).unwrap();

    // Resolved per call, so redefinition is picked up.
    engine.define("app/events", "onTick", recorder.tagged("v2"));
    adapter.call("onTick", vec![Value::from("b")]).unwrap();

    assert_eq!(
        recorder.calls(),
        vec![
            vec![Value::from("v1"), Value::from("a")],
            vec![Value::from("v2"), Value::from("b")],
        ]
    );
}

#[test]
fn test_unresolved_module_reference_fails_sync_call() {
    let engine = engine();
    let adapter = EventAdapter::new(engine.shared(), &listener_interface()).unwrap();

    adapter
        .add_sync_listener("onTick", Value::module_ref("app/missing", "onTick"))
        .unwrap();

    let err = adapter.call("onTick", vec![Value::from("x")]).unwrap_err();
    let InvocationError::Listener { source, .. } = err else {
        panic!("expected a listener error");
    };
    assert!(matches!(
        source.downcast_ref::<EngineError>(),
        Some(EngineError::UnresolvedTarget { .. })
    ));
    assert_eq!(engine.stats().released, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_adapter_on_existing_runtime() {
    let engine = TaskEngine::new().unwrap();
    let recorder = Recorder::new();
    let adapter = EventAdapter::new(engine.shared(), &listener_interface()).unwrap();
    adapter.add_listener("onTick", recorder.function()).unwrap();

    let done = tokio::task::spawn_blocking(move || {
        adapter.call("onTick", vec![Value::from("from tokio")]).unwrap();
        recorder.wait_for(1, TIMEOUT)
    })
    .await
    .unwrap();
    assert!(done);
}
