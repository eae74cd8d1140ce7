//! Dispatch of one callback record.
//!
//! | binding | sync                               | async                          |
//! |---------|------------------------------------|--------------------------------|
//! | bound   | `invoke` on the captured worker    | `submit` to the captured worker |
//! | lazy    | acquire, `invoke`, release          | acquire, `submit`, release      |
//!
//! Lazy acquisitions go through a [`WorkerLease`], released exactly once on
//! every path. For async records the release pairs with the submission, not
//! with completion of the work.

use crate::{
    callback::{CallbackRecord, DispatchMode, WorkerBinding},
    engine::{Engine, Worker, WorkerLease},
    error::InvocationError,
    value::Value,
};

/// Run `record` for `event` with `args`.
///
/// Only sync records can fail. For async records, failing to get a worker or
/// to submit is logged and dropped.
pub fn dispatch(
    engine: &dyn Engine,
    event: &str,
    record: &CallbackRecord,
    args: &[Value],
) -> Result<(), InvocationError> {
    match record.binding() {
        WorkerBinding::Bound(worker) => run_on(worker.as_ref(), event, record, args),
        WorkerBinding::Lazy => match (WorkerLease::acquire(engine), record.mode()) {
            (Ok(lease), _) => run_on(lease.worker(), event, record, args),
            (Err(err), DispatchMode::Sync) => Err(InvocationError::Worker(err)),
            (Err(_err), DispatchMode::Async) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(event, error = %_err, "no worker for async listener");
                Ok(())
            }
        },
    }
}

fn run_on(
    worker: &dyn Worker,
    event: &str,
    record: &CallbackRecord,
    args: &[Value],
) -> Result<(), InvocationError> {
    let target = record.target().to_target();

    #[cfg(feature = "tracing")]
    tracing::trace!(event, %target, worker = %worker.id(), mode = ?record.mode(), "dispatching listener");

    match record.mode() {
        DispatchMode::Sync => worker
            .invoke(&target, args)
            .map(drop)
            .map_err(|source| InvocationError::Listener {
                event: event.to_owned(),
                source,
            }),
        DispatchMode::Async => {
            if let Err(_err) = worker.submit(target, args.to_vec()) {
                #[cfg(feature = "tracing")]
                tracing::warn!(event, worker = %worker.id(), error = %_err, "failed to submit listener");
            }
            Ok(())
        }
    }
}
