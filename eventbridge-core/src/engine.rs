//! # Hosting engine seam
//!
//! The adapter never runs listener code itself. It hands a [`Target`] and its
//! arguments to a [`Worker`], and asks the hosting [`Engine`] which worker to
//! use:
//!
//! - the worker that is current on this thread when a function listener is
//!   registered, captured once;
//! - or a worker acquired fresh for a single invocation, held through a
//!   [`WorkerLease`] that releases it exactly once when dropped.
//!
//! `eventbridge-std` ships a tokio-backed implementation of both traits.

use crate::{
    error::BoxError,
    value::{Function, Scope, Value},
};
use std::{fmt, sync::Arc};

/// Identifies a worker within its engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// What a worker is asked to run.
#[derive(Clone, Debug)]
pub enum Target {
    /// A function value and the scope it belongs to.
    Function {
        /// Owning scope.
        scope: Scope,
        /// The callable.
        function: Function,
    },
    /// An exported function, looked up by the worker.
    Named {
        /// Module id.
        module: String,
        /// Export name.
        name: String,
    },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Function { scope, function } => match function.name() {
                Some(name) => write!(f, "{}:{name}", scope.name()),
                None => write!(f, "{}:<anonymous>", scope.name()),
            },
            Target::Named { module, name } => write!(f, "{module}#{name}"),
        }
    }
}

/// An execution context that can run targets.
pub trait Worker: Send + Sync + 'static {
    /// The worker's id.
    fn id(&self) -> WorkerId;

    /// Run `target` now, blocking until it returns.
    fn invoke(&self, target: &Target, args: &[Value]) -> Result<Value, BoxError>;

    /// Queue `target` for later execution and return immediately.
    ///
    /// An `Err` means the work was not queued. Failures of the work itself
    /// are the worker's to handle.
    fn submit(&self, target: Target, args: Vec<Value>) -> Result<(), BoxError>;
}

/// The engine hosting adapters and their workers.
pub trait Engine: Send + Sync + 'static {
    /// The worker running on this thread, if any.
    fn current_worker(&self) -> Option<Arc<dyn Worker>>;

    /// Take a worker for exclusive use. Pair with [`Engine::release_worker`],
    /// or use [`WorkerLease`].
    fn acquire_worker(&self) -> Result<Arc<dyn Worker>, BoxError>;

    /// Give back a worker taken with [`Engine::acquire_worker`].
    ///
    /// Work already submitted to it keeps running.
    fn release_worker(&self, worker: Arc<dyn Worker>);
}

/// A scoped worker acquisition.
///
/// The worker goes back to the engine when the lease is dropped, on every
/// exit path.
pub struct WorkerLease<'a> {
    engine: &'a dyn Engine,
    worker: Arc<dyn Worker>,
}

impl<'a> WorkerLease<'a> {
    /// Acquire a worker from `engine`.
    pub fn acquire(engine: &'a dyn Engine) -> Result<Self, BoxError> {
        let worker = engine.acquire_worker()?;
        Ok(Self { engine, worker })
    }

    /// The leased worker.
    pub fn worker(&self) -> &dyn Worker {
        self.worker.as_ref()
    }
}

impl Drop for WorkerLease<'_> {
    fn drop(&mut self) {
        self.engine.release_worker(Arc::clone(&self.worker));
    }
}

impl fmt::Debug for WorkerLease<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerLease")
            .field("worker", &self.worker.id())
            .finish()
    }
}
