//! Engine configuration.

use crate::error::EngineError;
use serde::Deserialize;

/// Settings for a [`TaskEngine`](crate::TaskEngine).
///
/// Deserializable so hosts can embed it in their own config files:
///
/// ```toml
/// [events]
/// max_idle_workers = 8
/// worker_name_prefix = "events"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Released workers kept around for reuse. Extra ones are shut down.
    pub max_idle_workers: usize,
    /// Prefix of worker names, which show up in logs.
    pub worker_name_prefix: String,
    /// Worker threads of an engine-owned runtime. `None` uses tokio's default.
    /// Ignored when the engine is given a runtime handle.
    pub runtime_threads: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_idle_workers: 4,
            worker_name_prefix: "eventbridge-worker".to_owned(),
            runtime_threads: None,
        }
    }
}

impl EngineConfig {
    /// Check values the runtime would otherwise reject.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.runtime_threads == Some(0) {
            return Err(EngineError::InvalidConfig {
                field: "runtime_threads",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}
