//! # eventbridge-core
//!
//! Core of the eventbridge interface-to-event adapter.
//!
//! Given the description of a native interface that is only known at runtime,
//! eventbridge synthesizes an implementation of it whose every method turns
//! into an event: the method name is the event name, the arguments are the
//! payload. Events fan out to listeners that run on worker contexts owned by
//! a hosting [`Engine`].
//!
//! This crate has minimal dependencies. The tokio-backed engine lives in
//! `eventbridge-std`.
//!
//! # Layers
//!
//! ## Synthesis ([`synthesize`])
//!
//! An [`InterfaceDescriptor`] becomes a [`SynthesizedType`]: one
//! [`MethodSlot`] per declared method, each forwarding its arguments to
//! `emit` and returning a default chosen by [`ReturnPolicy`]. Types are
//! installed into the process-wide [`TypeSpace`] and cached per interface.
//!
//! ## Instances ([`EventAdapter`])
//!
//! Each adaptation yields an [`EventAdapter`] owning a [`ListenerRegistry`].
//! Native callers enter through [`EventAdapter::call`] or
//! [`EventAdapter::invoke_slot`].
//!
//! ## Dispatch ([`dispatch`])
//!
//! Each [`CallbackRecord`] runs sync or async, on the worker captured at
//! registration or on one leased from the engine for the single call.
//!
//! # Error Types
//!
//! - [`AdapterError`] - Top-level error type
//! - [`ConstructionError`] - Unsupported constructor arguments
//! - [`GenerationError`] - Synthesis and installation failures
//! - [`RegistrationError`] - Rejected listener values
//! - [`InvocationError`] - Forwarding and listener failures

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod adapter;
mod callback;
mod descriptor;
mod dispatch;
mod engine;
mod error;
mod registry;
mod synth;
mod value;

// Re-exports
pub use adapter::EventAdapter;
pub use callback::{CallbackRecord, CallbackTarget, DispatchMode, ListenerHandle, WorkerBinding};
pub use descriptor::{InterfaceDescriptor, MethodSignature, Primitive, TypeKind, TypeRef};
pub use dispatch::dispatch;
pub use engine::{Engine, Target, Worker, WorkerId, WorkerLease};
pub use error::{
    AdapterError, BoxError, ConstructionError, ConversionError, EmitError, GenerationError,
    InvocationError, RegistrationError,
};
pub use registry::ListenerRegistry;
pub use synth::{MethodSlot, ReturnPolicy, SynthesizedType, TypeSpace, synthesize};
pub use value::{FromValue, Function, HostObject, Scope, Value};
