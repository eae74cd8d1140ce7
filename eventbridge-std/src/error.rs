//! Error types for the standard engine.

use eventbridge_core::WorkerId;
use thiserror::Error;

/// Errors raised by [`TaskEngine`](crate::TaskEngine) and its workers.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A `(module, name)` listener does not resolve to a defined function.
    #[error("no function `{name}` defined in module `{module}`")]
    UnresolvedTarget {
        /// Module id.
        module: String,
        /// Export name.
        name: String,
    },

    /// The worker's queue no longer accepts work.
    #[error("{worker} is shut down")]
    QueueClosed {
        /// The closed worker.
        worker: WorkerId,
    },

    /// A configuration value is out of range.
    #[error("invalid engine config: `{field}` {reason}")]
    InvalidConfig {
        /// The offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The engine runtime could not be built.
    #[error("failed to build engine runtime")]
    Runtime(#[from] std::io::Error),
}
