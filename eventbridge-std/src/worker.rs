//! Task workers.
//!
//! A [`TaskWorker`] is a serial execution context. `invoke` runs a target on
//! the calling thread; `submit` queues it. A task on the engine runtime
//! drains the queue, running each job on tokio's blocking pool. Either way
//! the target runs under the worker's lock with the worker marked as the
//! thread's current worker, so listeners registered from inside it bind to
//! it.

use crate::{engine::Counters, error::EngineError, modules::ModuleRegistry};
use eventbridge_core::{BoxError, Target, Value, Worker, WorkerId};
use std::{
    cell::RefCell,
    fmt,
    sync::{Arc, Mutex, PoisonError, Weak},
};
use tokio::{runtime::Handle, sync::mpsc};

struct Job {
    target: Target,
    args: Vec<Value>,
}

// ============================================================================
// Current worker marker
// ============================================================================

#[derive(Clone)]
struct Current {
    id: WorkerId,
    // `None` while a queue drains jobs for a worker that was already dropped.
    worker: Option<Arc<TaskWorker>>,
}

thread_local! {
    static CURRENT: RefCell<Option<Current>> = const { RefCell::new(None) };
}

/// The worker running on this thread, if any.
pub(crate) fn current() -> Option<Arc<TaskWorker>> {
    CURRENT.with(|c| c.borrow().as_ref().and_then(|cur| cur.worker.clone()))
}

fn current_id() -> Option<WorkerId> {
    CURRENT.with(|c| c.borrow().as_ref().map(|cur| cur.id))
}

struct EnterGuard {
    previous: Option<Current>,
}

impl EnterGuard {
    fn enter(current: Current) -> Self {
        let previous = CURRENT.with(|c| c.replace(Some(current)));
        Self { previous }
    }
}

impl Drop for EnterGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|c| *c.borrow_mut() = previous);
    }
}

// ============================================================================
// TaskWorker
// ============================================================================

/// State shared by a worker and its queue task.
struct WorkerCore {
    id: WorkerId,
    name: String,
    lock: Mutex<()>,
    modules: Arc<ModuleRegistry>,
    counters: Arc<Counters>,
}

impl WorkerCore {
    fn enter<R>(&self, worker: Option<Arc<TaskWorker>>, f: impl FnOnce() -> R) -> R {
        // Re-entrant calls already hold the lock.
        if current_id() == Some(self.id) {
            return f();
        }
        let _lock = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _enter = EnterGuard::enter(Current {
            id: self.id,
            worker,
        });
        f()
    }

    fn call(&self, target: &Target, args: &[Value]) -> Result<Value, BoxError> {
        match target {
            Target::Function { function, .. } => function.call(args),
            Target::Named { module, name } => self.modules.resolve(module, name)?.call(args),
        }
    }
}

/// A serial worker backed by a tokio task.
pub struct TaskWorker {
    core: Arc<WorkerCore>,
    queue: mpsc::UnboundedSender<Job>,
    this: Weak<TaskWorker>,
}

impl TaskWorker {
    pub(crate) fn spawn(
        id: WorkerId,
        name: String,
        modules: Arc<ModuleRegistry>,
        counters: Arc<Counters>,
        runtime: &Handle,
    ) -> Arc<Self> {
        let core = Arc::new(WorkerCore {
            id,
            name,
            lock: Mutex::new(()),
            modules,
            counters,
        });
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Arc::new_cyclic(|this| TaskWorker {
            core: Arc::clone(&core),
            queue: tx,
            this: this.clone(),
        });
        runtime.spawn(drain(core, Arc::downgrade(&worker), rx));
        worker
    }

    /// The worker's name, as shown in logs.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Run `f` inside this worker, on the calling thread.
    ///
    /// Waits for any job currently running on the worker.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        self.core.enter(self.this.upgrade(), f)
    }
}

impl Worker for TaskWorker {
    fn id(&self) -> WorkerId {
        self.core.id
    }

    fn invoke(&self, target: &Target, args: &[Value]) -> Result<Value, BoxError> {
        self.enter(|| self.core.call(target, args))
    }

    fn submit(&self, target: Target, args: Vec<Value>) -> Result<(), BoxError> {
        self.queue
            .send(Job { target, args })
            .map_err(|_| EngineError::QueueClosed { worker: self.core.id }.into())
    }
}

impl fmt::Debug for TaskWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskWorker")
            .field("id", &self.core.id)
            .field("name", &self.core.name)
            .finish()
    }
}

/// Runs queued jobs in order until every sender is gone and the queue is
/// empty.
async fn drain(core: Arc<WorkerCore>, worker: Weak<TaskWorker>, mut rx: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = rx.recv().await {
        let job_core = Arc::clone(&core);
        let current = worker.upgrade();
        let result = tokio::task::spawn_blocking(move || {
            job_core.enter(current, || job_core.call(&job.target, &job.args))
        })
        .await;

        let failed = match result {
            Ok(Ok(_)) => false,
            Ok(Err(_err)) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(worker = %core.name, error = %_err, "async listener failed");
                true
            }
            Err(_join) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(worker = %core.name, error = %_join, "async listener panicked");
                true
            }
        };
        core.counters.job_finished(failed);
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(worker = %core.name, "worker queue closed");
}
