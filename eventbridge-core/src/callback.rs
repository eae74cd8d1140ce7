//! Callback records.
//!
//! A [`CallbackRecord`] is built once at registration time and never changes.
//! It captures what to call ([`CallbackTarget`]), how to call it
//! ([`DispatchMode`]) and where ([`WorkerBinding`]).

use crate::{
    engine::{Engine, Target, Worker},
    error::RegistrationError,
    value::{Function, Scope, Value},
};
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Token returned by a successful registration.
///
/// Pass it back to [`EventAdapter::remove_listener`] to unregister.
///
/// [`EventAdapter::remove_listener`]: crate::EventAdapter::remove_listener
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle(u64);

impl ListenerHandle {
    fn next() -> Self {
        ListenerHandle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id.
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Whether the emitting call waits for the listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispatchMode {
    /// Block the emitter until the listener returns; propagate its failure.
    Sync,
    /// Submit to the worker's queue and return immediately.
    Async,
}

/// What a record calls.
#[derive(Clone, Debug)]
pub enum CallbackTarget {
    /// A function value, with the scope it was defined in.
    Bound {
        /// Owning scope.
        scope: Scope,
        /// The callable.
        function: Function,
    },
    /// A module export, resolved by the worker on every invocation.
    Deferred {
        /// Module id.
        module: String,
        /// Export name.
        name: String,
    },
}

impl CallbackTarget {
    /// Interpret a listener value.
    ///
    /// Accepts a function, or an object with string `module` and `name`
    /// properties.
    pub fn from_value(value: &Value) -> Result<Self, RegistrationError> {
        match value {
            Value::Function(function) => Ok(CallbackTarget::Bound {
                scope: function.scope().clone(),
                function: function.clone(),
            }),
            Value::Map(props) => {
                let module = string_property(props.get("module"), "module")?;
                let name = string_property(props.get("name"), "name")?;
                Ok(CallbackTarget::Deferred { module, name })
            }
            other => Err(RegistrationError::NotCallable {
                found: other.kind(),
            }),
        }
    }

    /// The target handed to a worker.
    pub fn to_target(&self) -> Target {
        match self {
            CallbackTarget::Bound { scope, function } => Target::Function {
                scope: scope.clone(),
                function: function.clone(),
            },
            CallbackTarget::Deferred { module, name } => Target::Named {
                module: module.clone(),
                name: name.clone(),
            },
        }
    }

    /// Whether `value` denotes this target.
    ///
    /// Functions match by identity, module references by `(module, name)`.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, CallbackTarget::from_value(value)) {
            (CallbackTarget::Bound { function, .. }, Ok(CallbackTarget::Bound { function: other, .. })) => {
                function.ptr_eq(&other)
            }
            (
                CallbackTarget::Deferred { module, name },
                Ok(CallbackTarget::Deferred {
                    module: other_module,
                    name: other_name,
                }),
            ) => *module == other_module && *name == other_name,
            _ => false,
        }
    }
}

fn string_property(
    value: Option<&Value>,
    property: &'static str,
) -> Result<String, RegistrationError> {
    match value {
        Some(Value::Str(s)) => Ok(s.clone()),
        None | Some(Value::Null) => Err(RegistrationError::MissingProperty { property }),
        Some(other) => Err(RegistrationError::InvalidProperty {
            property,
            found: other.kind(),
        }),
    }
}

/// Which worker runs a record.
#[derive(Clone)]
pub enum WorkerBinding {
    /// Captured at registration time.
    Bound(Arc<dyn Worker>),
    /// Acquired from the engine for each invocation.
    Lazy,
}

impl fmt::Debug for WorkerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerBinding::Bound(worker) => f.debug_tuple("Bound").field(&worker.id()).finish(),
            WorkerBinding::Lazy => f.write_str("Lazy"),
        }
    }
}

/// One registered listener.
#[derive(Debug)]
pub struct CallbackRecord {
    handle: ListenerHandle,
    target: CallbackTarget,
    mode: DispatchMode,
    binding: WorkerBinding,
}

impl CallbackRecord {
    /// Build a record for `value`.
    ///
    /// A function listener is bound to the engine's current worker, if there
    /// is one. Module references, and functions registered outside any
    /// worker, are bound lazily.
    pub fn new(
        engine: &dyn Engine,
        value: &Value,
        mode: DispatchMode,
    ) -> Result<Self, RegistrationError> {
        let target = CallbackTarget::from_value(value)?;
        let binding = match &target {
            CallbackTarget::Bound { .. } => engine
                .current_worker()
                .map_or(WorkerBinding::Lazy, WorkerBinding::Bound),
            CallbackTarget::Deferred { .. } => WorkerBinding::Lazy,
        };
        Ok(Self {
            handle: ListenerHandle::next(),
            target,
            mode,
            binding,
        })
    }

    /// The registration token.
    pub fn handle(&self) -> ListenerHandle {
        self.handle
    }

    /// What the record calls.
    pub fn target(&self) -> &CallbackTarget {
        &self.target
    }

    /// Sync or async.
    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Where the record runs.
    pub fn binding(&self) -> &WorkerBinding {
        &self.binding
    }
}
