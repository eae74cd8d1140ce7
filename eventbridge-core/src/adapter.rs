//! # Adapter instances
//!
//! An [`EventAdapter`] is an instance of a synthesized adapter type. Native
//! code calls it through the method table ([`EventAdapter::call`],
//! [`EventAdapter::invoke_slot`]); each call becomes an event that fans out to
//! the listeners registered for the method's name.
//!
//! # Example
//!
//! ```rust,ignore
//! let listener = InterfaceDescriptor::interface("Listener")
//!     .method(MethodSignature::new("onTick").param(TypeRef::object()))
//!     .method(MethodSignature::new("onAsk").param(TypeRef::object()).returns(Primitive::Boolean));
//!
//! let adapter = EventAdapter::new(engine, &listener)?;
//! adapter.add_sync_listener("onTick", Function::new(|args| {
//!     println!("tick {args:?}");
//!     Ok(Value::Null)
//! }))?;
//!
//! adapter.call("onTick", vec![Value::Int(42)])?;
//! assert_eq!(adapter.call("onAsk", vec!["x".into()])?, Value::Bool(true));
//! ```

use crate::{
    callback::{CallbackRecord, DispatchMode, ListenerHandle},
    descriptor::InterfaceDescriptor,
    dispatch::dispatch,
    engine::Engine,
    error::{AdapterError, ConstructionError, EmitError, InvocationError, RegistrationError},
    registry::ListenerRegistry,
    synth::{SynthesizedType, synthesize},
    value::Value,
};
use std::{fmt, sync::Arc};

struct AdapterInner {
    ty: Arc<SynthesizedType>,
    engine: Arc<dyn Engine>,
    listeners: ListenerRegistry,
}

/// An object implementing an adapted interface by emitting events.
///
/// Clones share the same listeners.
#[derive(Clone)]
pub struct EventAdapter {
    inner: Arc<AdapterInner>,
}

impl EventAdapter {
    /// Script-style constructor: `new EventAdapter(SomeInterface)`.
    ///
    /// Takes exactly one argument, a [`Value::Type`] describing an interface.
    pub fn construct(engine: Arc<dyn Engine>, args: &[Value]) -> Result<Self, AdapterError> {
        let descriptor = match args {
            [Value::Type(descriptor)] => descriptor,
            _ => {
                return Err(ConstructionError::NotATypeArgument {
                    position: 1,
                    found: args
                        .first()
                        .map_or_else(|| "undefined".to_owned(), Value::to_string),
                }
                .into());
            }
        };
        Self::new(engine, descriptor)
    }

    /// Adapt `descriptor`, synthesizing its adapter type on first use.
    pub fn new(engine: Arc<dyn Engine>, descriptor: &InterfaceDescriptor) -> Result<Self, AdapterError> {
        let ty = synthesize(descriptor)?;
        Ok(Self::with_type(engine, ty))
    }

    /// Instantiate an already synthesized type.
    pub fn with_type(engine: Arc<dyn Engine>, ty: Arc<SynthesizedType>) -> Self {
        Self {
            inner: Arc::new(AdapterInner {
                ty,
                engine,
                listeners: ListenerRegistry::new(),
            }),
        }
    }

    /// The synthesized type this instance belongs to.
    pub fn synthesized_type(&self) -> &Arc<SynthesizedType> {
        &self.inner.ty
    }

    /// The hosting engine.
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.inner.engine
    }

    // ------------------------------------------------------------------------
    // Listener management
    // ------------------------------------------------------------------------

    /// Register an async listener for `event`.
    ///
    /// `callable` is a function, or an object with `module` and `name`
    /// properties (see [`Value::module_ref`]).
    pub fn add_listener(
        &self,
        event: &str,
        callable: impl Into<Value>,
    ) -> Result<ListenerHandle, RegistrationError> {
        self.register(event, &callable.into(), DispatchMode::Async)
    }

    /// Register a sync listener for `event`.
    ///
    /// Emitting `event` blocks until this listener returns, and its failure
    /// surfaces at the emitting call.
    pub fn add_sync_listener(
        &self,
        event: &str,
        callable: impl Into<Value>,
    ) -> Result<ListenerHandle, RegistrationError> {
        self.register(event, &callable.into(), DispatchMode::Sync)
    }

    fn register(
        &self,
        event: &str,
        callable: &Value,
        mode: DispatchMode,
    ) -> Result<ListenerHandle, RegistrationError> {
        let record = match CallbackRecord::new(self.inner.engine.as_ref(), callable, mode) {
            Ok(record) => record,
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(event, error = %err, "refused event listener");
                return Err(err);
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            event,
            handle = record.handle().id(),
            ?mode,
            binding = ?record.binding(),
            "registered event listener"
        );

        Ok(self.inner.listeners.add(event, record))
    }

    /// Unregister the listener added under `handle`. Unknown handles are
    /// ignored.
    pub fn remove_listener(&self, event: &str, handle: ListenerHandle) -> &Self {
        self.inner.listeners.remove(event, handle);
        self
    }

    /// Unregister the first listener registered with `callable`.
    ///
    /// Functions match by identity, module references by module and name.
    /// Prefer [`EventAdapter::remove_listener`] with the registration handle.
    pub fn remove_listener_value(&self, event: &str, callable: &Value) -> &Self {
        self.inner
            .listeners
            .remove_first(event, |record| record.target().matches(callable));
        self
    }

    /// Unregister every listener for `event`.
    pub fn remove_all_listeners(&self, event: &str) -> &Self {
        self.inner.listeners.clear(event);
        self
    }

    /// Number of listeners for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.listeners.len(event)
    }

    /// Events with at least one listener, sorted.
    pub fn event_names(&self) -> Vec<String> {
        self.inner.listeners.event_names()
    }

    // ------------------------------------------------------------------------
    // Emission
    // ------------------------------------------------------------------------

    /// Run every listener for `event` with `args`, in registration order.
    ///
    /// Returns the first sync listener failure, after which the remaining
    /// listeners are skipped. Async listener failures never surface here.
    pub fn emit(&self, event: &str, args: &[Value]) -> Result<(), EmitError> {
        let Some(records) = self.inner.listeners.snapshot(event) else {
            return Ok(());
        };
        let engine = self.inner.engine.as_ref();
        for record in &records {
            dispatch(engine, event, record, args)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Native entry points
    // ------------------------------------------------------------------------

    /// Call interface method `method` as a native caller would.
    ///
    /// Overloads are told apart by argument count.
    pub fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, InvocationError> {
        let slot = self.inner.ty.resolve(method, args.len())?;
        slot.forward(self, args)
    }

    /// Call the method in slot `index` of the synthesized type.
    pub fn invoke_slot(&self, index: usize, args: Vec<Value>) -> Result<Value, InvocationError> {
        let slot = self.inner.ty.slot(index)?;
        slot.forward(self, args)
    }
}

impl fmt::Debug for EventAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventAdapter")
            .field("type", &self.inner.ty.name())
            .field("interface", &self.inner.ty.descriptor().name())
            .field("events", &self.event_names())
            .finish()
    }
}
