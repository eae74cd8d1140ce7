//! # eventbridge - Interfaces as Event Emitters
//!
//! `eventbridge` adapts interfaces that are only described at runtime into
//! event emitters. Every method of the interface becomes an event of the same
//! name; calling it fans the arguments out to the listeners registered for
//! that event and returns a default value.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use eventbridge::prelude::*;
//!
//! let engine = TaskEngine::new()?;
//! let listener = InterfaceDescriptor::interface("com.example.Listener")
//!     .method(MethodSignature::new("onTick").param(TypeRef::reference("java.lang.String")))
//!     .method(
//!         MethodSignature::new("onAsk")
//!             .param(TypeRef::reference("java.lang.String"))
//!             .returns(Primitive::Boolean),
//!     );
//!
//! let adapter = EventAdapter::new(engine.shared(), &listener)?;
//! adapter.add_sync_listener("onTick", Function::new(|args| {
//!     println!("tick: {args:?}");
//!     Ok(Value::Null)
//! }))?;
//!
//! adapter.call("onTick", vec![Value::from("hello")])?;
//! assert_eq!(adapter.call("onAsk", vec![Value::from("ok?")])?, Value::Bool(true));
//! ```
//!
//! ## Typed Traits
//!
//! With the `macros` feature, `#[event_interface]` does the same for a Rust
//! trait and generates a `<Trait>Adapter` that implements it.
//!
//! ## Crates
//!
//! - `eventbridge-core`: values, descriptors, synthesis, adapters, dispatch
//! - `eventbridge-std`: the tokio-backed [`TaskEngine`]
//! - `eventbridge-macros`: `#[event_interface]`

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use eventbridge_core::{
    // Errors
    AdapterError,
    BoxError,
    // Dispatch
    CallbackRecord,
    CallbackTarget,
    ConstructionError,
    ConversionError,
    DispatchMode,
    EmitError,
    // Engine seam
    Engine,
    // Adapters
    EventAdapter,
    // Values
    FromValue,
    Function,
    GenerationError,
    HostObject,
    // Descriptors
    InterfaceDescriptor,
    InvocationError,
    ListenerHandle,
    ListenerRegistry,
    MethodSignature,
    // Synthesis
    MethodSlot,
    Primitive,
    RegistrationError,
    ReturnPolicy,
    Scope,
    SynthesizedType,
    Target,
    TypeKind,
    TypeRef,
    TypeSpace,
    Value,
    Worker,
    WorkerBinding,
    WorkerId,
    WorkerLease,
    dispatch,
    synthesize,
};

// Standard engine
pub use eventbridge_std::{
    EngineConfig, EngineError, EngineStats, ModuleRegistry, TaskEngine, TaskEngineBuilder,
    TaskWorker, testing,
};

#[cfg(feature = "macros")]
pub use eventbridge_macros::event_interface;

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        AdapterError, Engine, EventAdapter, FromValue, Function, InterfaceDescriptor,
        ListenerHandle, MethodSignature, Primitive, TaskEngine, TypeRef, Value,
    };

    #[cfg(feature = "macros")]
    pub use crate::event_interface;
}
