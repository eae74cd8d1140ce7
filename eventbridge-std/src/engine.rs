//! # TaskEngine
//!
//! A hosting [`Engine`] backed by tokio.
//!
//! Workers come from a pool. [`Engine::acquire_worker`] reuses an idle worker
//! or spawns a new one; [`Engine::release_worker`] puts it back, keeping at
//! most [`EngineConfig::max_idle_workers`] idle. Work already queued on a
//! released worker keeps running.
//!
//! # Example
//!
//! ```rust,ignore
//! let engine = TaskEngine::builder().max_idle_workers(2).build()?;
//! engine.define("app/events", "onTick", Function::new(|args| {
//!     println!("tick {args:?}");
//!     Ok(Value::Null)
//! }));
//!
//! let adapter = EventAdapter::new(engine.shared(), &listener)?;
//! adapter.add_listener("onTick", Value::module_ref("app/events", "onTick"))?;
//! ```

use crate::{
    config::EngineConfig, error::EngineError, modules::ModuleRegistry, worker::TaskWorker,
};
use eventbridge_core::{BoxError, Engine, Function, Worker, WorkerId};
use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::runtime::{Builder, Handle, Runtime};

// ============================================================================
// Stats
// ============================================================================

#[derive(Debug, Default)]
pub(crate) struct Counters {
    workers_created: AtomicU64,
    acquired: AtomicU64,
    released: AtomicU64,
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
}

impl Counters {
    pub(crate) fn job_finished(&self, failed: bool) {
        self.jobs_completed.fetch_add(1, Ordering::AcqRel);
        if failed {
            self.jobs_failed.fetch_add(1, Ordering::AcqRel);
        }
    }

    fn snapshot(&self) -> EngineStats {
        EngineStats {
            workers_created: self.workers_created.load(Ordering::Acquire),
            acquired: self.acquired.load(Ordering::Acquire),
            released: self.released.load(Ordering::Acquire),
            jobs_completed: self.jobs_completed.load(Ordering::Acquire),
            jobs_failed: self.jobs_failed.load(Ordering::Acquire),
        }
    }
}

/// Point-in-time engine counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Workers spawned since the engine started.
    pub workers_created: u64,
    /// Successful worker acquisitions.
    pub acquired: u64,
    /// Worker releases.
    pub released: u64,
    /// Queued jobs that ran to completion, failed or not.
    pub jobs_completed: u64,
    /// Queued jobs that returned an error or panicked.
    pub jobs_failed: u64,
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`TaskEngine`].
#[derive(Debug, Default)]
pub struct TaskEngineBuilder {
    config: EngineConfig,
    handle: Option<Handle>,
}

impl TaskEngineBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set [`EngineConfig::max_idle_workers`].
    pub fn max_idle_workers(mut self, max: usize) -> Self {
        self.config.max_idle_workers = max;
        self
    }

    /// Set [`EngineConfig::worker_name_prefix`].
    pub fn worker_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.worker_name_prefix = prefix.into();
        self
    }

    /// Set [`EngineConfig::runtime_threads`].
    pub fn runtime_threads(mut self, threads: usize) -> Self {
        self.config.runtime_threads = Some(threads);
        self
    }

    /// Run workers on an existing runtime instead of an engine-owned one.
    pub fn handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<TaskEngine, EngineError> {
        self.config.validate()?;
        let (handle, owned) = match self.handle {
            Some(handle) => (handle, None),
            None => {
                let mut builder = Builder::new_multi_thread();
                builder
                    .enable_all()
                    .thread_name(format!("{}-rt", self.config.worker_name_prefix));
                if let Some(threads) = self.config.runtime_threads {
                    builder.worker_threads(threads);
                }
                let runtime = builder.build()?;
                (runtime.handle().clone(), Some(runtime))
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(owned_runtime = owned.is_some(), config = ?self.config, "starting task engine");

        Ok(TaskEngine {
            inner: Arc::new(EngineInner {
                config: self.config,
                handle,
                owned,
                modules: Arc::new(ModuleRegistry::new()),
                idle: Mutex::new(Vec::new()),
                leased: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                counters: Arc::new(Counters::default()),
            }),
        })
    }
}

// ============================================================================
// TaskEngine
// ============================================================================

struct EngineInner {
    config: EngineConfig,
    handle: Handle,
    owned: Option<Runtime>,
    modules: Arc<ModuleRegistry>,
    idle: Mutex<Vec<Arc<TaskWorker>>>,
    leased: Mutex<HashMap<WorkerId, Arc<TaskWorker>>>,
    next_id: AtomicU64,
    counters: Arc<Counters>,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        if let Some(runtime) = self.owned.take() {
            runtime.shutdown_background();
        }
    }
}

/// A tokio-backed hosting engine with a worker pool.
///
/// Cheap to clone; clones share the pool and the module registry.
#[derive(Clone)]
pub struct TaskEngine {
    inner: Arc<EngineInner>,
}

impl TaskEngine {
    /// Start configuring an engine.
    pub fn builder() -> TaskEngineBuilder {
        TaskEngineBuilder::default()
    }

    /// An engine with default settings, on the current tokio runtime if
    /// there is one, otherwise on a runtime of its own.
    pub fn new() -> Result<Self, EngineError> {
        let builder = Self::builder();
        match Handle::try_current() {
            Ok(handle) => builder.handle(handle).build(),
            Err(_) => builder.build(),
        }
    }

    /// This engine as the trait object adapters hold.
    pub fn shared(&self) -> Arc<dyn Engine> {
        Arc::new(self.clone())
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Exports used by `(module, name)` listeners.
    pub fn modules(&self) -> &ModuleRegistry {
        &self.inner.modules
    }

    /// Shorthand for `modules().define(..)`.
    pub fn define(&self, module: &str, name: &str, function: Function) {
        self.inner.modules.define(module, name, function);
    }

    /// Current counters.
    pub fn stats(&self) -> EngineStats {
        self.inner.counters.snapshot()
    }

    /// Number of pooled idle workers.
    pub fn idle_workers(&self) -> usize {
        lock(&self.inner.idle).len()
    }

    /// Run `f` inside a pooled worker on the calling thread.
    ///
    /// Function listeners registered by `f` bind to that worker.
    pub fn run_in_worker<R>(&self, f: impl FnOnce() -> R) -> R {
        let worker = self.acquire();
        let _release = ReleaseOnDrop {
            engine: self,
            id: worker.id(),
        };
        worker.enter(f)
    }

    fn acquire(&self) -> Arc<TaskWorker> {
        let pooled = lock(&self.inner.idle).pop();
        let worker = pooled.unwrap_or_else(|| self.spawn_worker());
        lock(&self.inner.leased).insert(worker.id(), Arc::clone(&worker));
        self.inner.counters.acquired.fetch_add(1, Ordering::AcqRel);
        worker
    }

    fn release(&self, id: WorkerId) {
        let Some(worker) = lock(&self.inner.leased).remove(&id) else {
            #[cfg(feature = "tracing")]
            tracing::warn!(worker = %id, "release of a worker that is not leased");
            return;
        };
        self.inner.counters.released.fetch_add(1, Ordering::AcqRel);

        let mut idle = lock(&self.inner.idle);
        if idle.len() < self.inner.config.max_idle_workers {
            idle.push(worker);
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(worker = worker.name(), "retiring surplus worker");
        }
    }

    fn spawn_worker(&self) -> Arc<TaskWorker> {
        let id = WorkerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let name = format!("{}-{}", self.inner.config.worker_name_prefix, id.0);
        self.inner
            .counters
            .workers_created
            .fetch_add(1, Ordering::AcqRel);

        #[cfg(feature = "tracing")]
        tracing::debug!(worker = %name, "spawning worker");

        TaskWorker::spawn(
            id,
            name,
            Arc::clone(&self.inner.modules),
            Arc::clone(&self.inner.counters),
            &self.inner.handle,
        )
    }
}

impl Engine for TaskEngine {
    fn current_worker(&self) -> Option<Arc<dyn Worker>> {
        crate::worker::current().map(|worker| worker as Arc<dyn Worker>)
    }

    fn acquire_worker(&self) -> Result<Arc<dyn Worker>, BoxError> {
        Ok(self.acquire())
    }

    fn release_worker(&self, worker: Arc<dyn Worker>) {
        self.release(worker.id());
    }
}

impl fmt::Debug for TaskEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskEngine")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

struct ReleaseOnDrop<'a> {
    engine: &'a TaskEngine,
    id: WorkerId,
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.engine.release(self.id);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Gate, Recorder};
    use eventbridge_core::{Target, Value, WorkerLease};
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_pool_reuses_released_workers() {
        let engine = TaskEngine::builder().max_idle_workers(1).build().unwrap();

        let first = engine.acquire_worker().unwrap();
        let first_id = first.id();
        engine.release_worker(first);
        let again = engine.acquire_worker().unwrap();

        assert_eq!(again.id(), first_id);
        engine.release_worker(again);
        assert_eq!(engine.stats().workers_created, 1);
        assert_eq!(engine.idle_workers(), 1);
    }

    #[test]
    fn test_surplus_workers_are_retired() {
        let engine = TaskEngine::builder().max_idle_workers(1).build().unwrap();

        let a = engine.acquire_worker().unwrap();
        let b = engine.acquire_worker().unwrap();
        engine.release_worker(a);
        engine.release_worker(b);

        assert_eq!(engine.idle_workers(), 1);
        let stats = engine.stats();
        assert_eq!(stats.acquired, 2);
        assert_eq!(stats.released, 2);
    }

    #[test]
    fn test_double_release_is_ignored() {
        let engine = TaskEngine::builder().build().unwrap();
        let worker = engine.acquire_worker().unwrap();
        engine.release_worker(Arc::clone(&worker));
        engine.release_worker(worker);
        assert_eq!(engine.stats().released, 1);
    }

    #[test]
    fn test_invoke_named_target() {
        let engine = TaskEngine::builder().build().unwrap();
        engine.define(
            "math",
            "double",
            Function::new(|args| match args {
                [Value::Int(n)] => Ok(Value::Int(n * 2)),
                _ => Err("expected one integer".into()),
            }),
        );
        let lease = WorkerLease::acquire(&engine).unwrap();

        let target = Target::Named {
            module: "math".into(),
            name: "double".into(),
        };
        assert_eq!(lease.worker().invoke(&target, &[Value::Int(21)]).unwrap(), Value::Int(42));

        let missing = Target::Named {
            module: "math".into(),
            name: "triple".into(),
        };
        let err = lease.worker().invoke(&missing, &[]).unwrap_err();
        assert!(err.downcast_ref::<EngineError>().is_some());
    }

    #[test]
    fn test_submitted_jobs_run_in_order() {
        let engine = TaskEngine::builder().build().unwrap();
        let recorder = Recorder::new();
        let worker = engine.acquire_worker().unwrap();

        for i in 0..5 {
            let target = Target::Function {
                scope: Default::default(),
                function: recorder.function(),
            };
            worker.submit(target, vec![Value::Int(i)]).unwrap();
        }
        engine.release_worker(worker);

        assert!(recorder.wait_for(5, TIMEOUT));
        let seen: Vec<_> = recorder.calls().into_iter().map(|args| args[0].clone()).collect();
        assert_eq!(seen, (0..5).map(Value::Int).collect::<Vec<_>>());
    }

    #[test]
    fn test_current_worker_inside_job() {
        let engine = TaskEngine::builder().build().unwrap();
        assert!(engine.current_worker().is_none());

        let seen = engine.run_in_worker(|| engine.current_worker().map(|w| w.id()));
        assert!(seen.is_some());
        assert!(engine.current_worker().is_none());
        assert_eq!(engine.stats().released, 1);
    }

    #[test]
    fn test_failed_jobs_are_counted() {
        let engine = TaskEngine::builder().build().unwrap();
        let gate = Gate::new();
        let worker = engine.acquire_worker().unwrap();

        let failing = Function::new(|_| Err("boom".into()));
        worker
            .submit(
                Target::Function {
                    scope: Default::default(),
                    function: failing,
                },
                vec![],
            )
            .unwrap();
        worker
            .submit(
                Target::Function {
                    scope: Default::default(),
                    function: gate.opener(),
                },
                vec![],
            )
            .unwrap();

        assert!(gate.wait(TIMEOUT));
        engine.release_worker(worker);
        assert_eq!(engine.stats().jobs_failed, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_engine_on_existing_runtime() {
        let engine = TaskEngine::new().unwrap();
        let recorder = Recorder::new();
        let worker = engine.acquire_worker().unwrap();
        worker
            .submit(
                Target::Function {
                    scope: Default::default(),
                    function: recorder.function(),
                },
                vec![Value::from("hello")],
            )
            .unwrap();
        engine.release_worker(worker);

        let done = tokio::task::spawn_blocking(move || recorder.wait_for(1, TIMEOUT))
            .await
            .unwrap();
        assert!(done);
    }

    #[test]
    fn test_zero_runtime_threads_fails_build() {
        let config: EngineConfig = serde_json::from_str(r#"{ "runtime_threads": 0 }"#).unwrap();
        let err = TaskEngine::builder().config(config).build().unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { field: "runtime_threads", .. }));

        assert!(TaskEngine::builder().runtime_threads(0).build().is_err());
    }

    #[test]
    fn test_runtime_threads_setter() {
        let engine = TaskEngine::builder().runtime_threads(1).build().unwrap();
        assert_eq!(engine.config().runtime_threads, Some(1));

        let recorder = Recorder::new();
        let worker = engine.acquire_worker().unwrap();
        worker
            .submit(
                Target::Function {
                    scope: Default::default(),
                    function: recorder.function(),
                },
                vec![],
            )
            .unwrap();
        engine.release_worker(worker);
        assert!(recorder.wait_for(1, TIMEOUT));
    }
}
