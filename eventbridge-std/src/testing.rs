//! Testing utilities for eventbridge.
//!
//! This module provides helpers for testing adapters and listeners.
//!
//! # Features
//!
//! - [`Recorder`]: Records the arguments of every call to its functions
//! - [`Gate`]: A latch for holding a listener until the test lets it go
//! - [`InlineEngine`]: A deterministic engine whose queued work runs only
//!   when the test asks

use eventbridge_core::{BoxError, Engine, Function, Target, Value, Worker, WorkerId};
use std::{
    collections::VecDeque,
    sync::{
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Recorder
// ============================================================================

/// Records the arguments of every call made to its functions.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = Recorder::new();
/// adapter.add_sync_listener("onTick", recorder.function())?;
/// adapter.call("onTick", vec![Value::Int(42)])?;
/// assert_eq!(recorder.calls(), vec![vec![Value::Int(42)]]);
/// ```
#[derive(Clone, Default)]
pub struct Recorder {
    state: Arc<(Mutex<Vec<Vec<Value>>>, Condvar)>,
}

impl Recorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// A function that records its arguments and returns null.
    pub fn function(&self) -> Function {
        self.returning(Value::Null)
    }

    /// A function that records its arguments and returns `value`.
    pub fn returning(&self, value: Value) -> Function {
        let state = Arc::clone(&self.state);
        Function::new(move |args| {
            let (calls, changed) = &*state;
            lock(calls).push(args.to_vec());
            changed.notify_all();
            Ok(value.clone())
        })
    }

    /// A function that records its arguments under `tag`, as the first
    /// element of each recorded call.
    pub fn tagged(&self, tag: &str) -> Function {
        let state = Arc::clone(&self.state);
        let tag = Value::from(tag);
        Function::new(move |args| {
            let (calls, changed) = &*state;
            let mut call = Vec::with_capacity(args.len() + 1);
            call.push(tag.clone());
            call.extend_from_slice(args);
            lock(calls).push(call);
            changed.notify_all();
            Ok(Value::Null)
        })
    }

    /// The recorded calls, oldest first.
    pub fn calls(&self) -> Vec<Vec<Value>> {
        lock(&self.state.0).clone()
    }

    /// Number of recorded calls.
    pub fn count(&self) -> usize {
        lock(&self.state.0).len()
    }

    /// Block until at least `n` calls are recorded or `timeout` passes.
    pub fn wait_for(&self, n: usize, timeout: Duration) -> bool {
        let (calls, changed) = &*self.state;
        let guard = lock(calls);
        let (guard, _) = changed
            .wait_timeout_while(guard, timeout, |calls| calls.len() < n)
            .unwrap_or_else(PoisonError::into_inner);
        guard.len() >= n
    }
}

// ============================================================================
// Gate
// ============================================================================

/// A one-shot latch.
///
/// [`Gate::blocker`] gives a listener that waits for the gate to open, which
/// makes "the emitter did not wait" observable.
#[derive(Clone, Default)]
pub struct Gate {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    /// A closed gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the gate, waking every waiter.
    pub fn open(&self) {
        let (open, changed) = &*self.state;
        *lock(open) = true;
        changed.notify_all();
    }

    /// Whether the gate is open.
    pub fn is_open(&self) -> bool {
        *lock(&self.state.0)
    }

    /// Block until the gate opens or `timeout` passes.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (open, changed) = &*self.state;
        let guard = lock(open);
        let (guard, _) = changed
            .wait_timeout_while(guard, timeout, |open| !*open)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    /// A function that opens the gate.
    pub fn opener(&self) -> Function {
        let gate = self.clone();
        Function::new(move |_| {
            gate.open();
            Ok(Value::Null)
        })
    }

    /// A function that blocks until the gate opens, failing after `timeout`.
    pub fn blocker(&self, timeout: Duration) -> Function {
        let gate = self.clone();
        Function::new(move |_| {
            if gate.wait(timeout) {
                Ok(Value::Null)
            } else {
                Err("gate was never opened".into())
            }
        })
    }
}

// ============================================================================
// InlineEngine
// ============================================================================

type Resolver = dyn Fn(&str, &str) -> Option<Function> + Send + Sync;

struct Queued {
    worker: WorkerId,
    target: Target,
    args: Vec<Value>,
}

#[derive(Default)]
struct InlineState {
    queue: Mutex<VecDeque<Queued>>,
    current: Mutex<Option<Arc<InlineWorker>>>,
    next_id: AtomicU64,
    acquired: AtomicU64,
    released: AtomicU64,
    resolver: Mutex<Option<Arc<Resolver>>>,
}

/// A single-threaded engine for deterministic tests.
///
/// `invoke` runs on the caller's thread. `submit` queues; nothing queued
/// runs until [`InlineEngine::run_pending`].
#[derive(Clone, Default)]
pub struct InlineEngine {
    state: Arc<InlineState>,
}

impl InlineEngine {
    /// Create an engine with an empty queue and no current worker.
    pub fn new() -> Self {
        Self::default()
    }

    /// This engine as the trait object adapters hold.
    pub fn shared(&self) -> Arc<dyn Engine> {
        Arc::new(self.clone())
    }

    /// Resolve `(module, name)` targets with `resolver`.
    pub fn with_resolver<F>(self, resolver: F) -> Self
    where
        F: Fn(&str, &str) -> Option<Function> + Send + Sync + 'static,
    {
        *lock(&self.state.resolver) = Some(Arc::new(resolver));
        self
    }

    /// Make a fresh worker current for the duration of `f`, returning its id.
    pub fn in_worker<R>(&self, f: impl FnOnce() -> R) -> (WorkerId, R) {
        let worker = self.new_worker();
        let id = worker.id;
        let previous = lock(&self.state.current).replace(worker);
        let result = f();
        *lock(&self.state.current) = previous;
        (id, result)
    }

    /// Run queued work in submission order, including work queued while
    /// running. Returns the number of jobs run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = lock(&self.state.queue).pop_front();
            let Some(job) = next else {
                return ran;
            };
            let _ = self.execute(&job.target, &job.args);
            ran += 1;
        }
    }

    /// Workers queued work was submitted to, in submission order.
    pub fn pending_workers(&self) -> Vec<WorkerId> {
        lock(&self.state.queue).iter().map(|job| job.worker).collect()
    }

    /// Number of queued jobs.
    pub fn pending(&self) -> usize {
        lock(&self.state.queue).len()
    }

    /// Worker acquisitions so far.
    pub fn acquired(&self) -> u64 {
        self.state.acquired.load(Ordering::SeqCst)
    }

    /// Worker releases so far.
    pub fn released(&self) -> u64 {
        self.state.released.load(Ordering::SeqCst)
    }

    fn new_worker(&self) -> Arc<InlineWorker> {
        Arc::new(InlineWorker {
            id: WorkerId(self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            engine: self.clone(),
        })
    }

    fn execute(&self, target: &Target, args: &[Value]) -> Result<Value, BoxError> {
        match target {
            Target::Function { function, .. } => function.call(args),
            Target::Named { module, name } => {
                let resolver = lock(&self.state.resolver).clone();
                let function = resolver
                    .and_then(|resolve| resolve(module, name))
                    .ok_or_else(|| format!("no function `{name}` in module `{module}`"))?;
                function.call(args)
            }
        }
    }
}

impl Engine for InlineEngine {
    fn current_worker(&self) -> Option<Arc<dyn Worker>> {
        lock(&self.state.current)
            .clone()
            .map(|worker| worker as Arc<dyn Worker>)
    }

    fn acquire_worker(&self) -> Result<Arc<dyn Worker>, BoxError> {
        self.state.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(self.new_worker())
    }

    fn release_worker(&self, _worker: Arc<dyn Worker>) {
        self.state.released.fetch_add(1, Ordering::SeqCst);
    }
}

struct InlineWorker {
    id: WorkerId,
    engine: InlineEngine,
}

impl Worker for InlineWorker {
    fn id(&self) -> WorkerId {
        self.id
    }

    fn invoke(&self, target: &Target, args: &[Value]) -> Result<Value, BoxError> {
        self.engine.execute(target, args)
    }

    fn submit(&self, target: Target, args: Vec<Value>) -> Result<(), BoxError> {
        lock(&self.engine.state.queue).push_back(Queued {
            worker: self.id,
            target,
            args,
        });
        Ok(())
    }
}
