//! Error types for eventbridge.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`AdapterError`] - Top-level error type for all adapter operations
//! - [`ConstructionError`] - Bad constructor arguments or unsupported interfaces
//! - [`GenerationError`] - Failures while synthesizing or installing an adapter type
//! - [`RegistrationError`] - Listener values that cannot be registered
//! - [`InvocationError`] - Failures while forwarding a call or running a listener

use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all adapter operations.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// The adapter could not be constructed.
    #[error("construction error: {0}")]
    Construction(#[from] ConstructionError),

    /// The adapter type could not be generated or installed.
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    /// A listener could not be registered.
    #[error("registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// A forwarded call or a listener failed.
    #[error("invocation error: {0}")]
    Invocation(#[from] InvocationError),
}

/// Errors raised by the adapter constructor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// The constructor was not given exactly one type argument.
    #[error("argument {position} must be an interface type, found {found}")]
    NotATypeArgument {
        /// 1-based argument position.
        position: usize,
        /// Rendering of what was passed instead.
        found: String,
    },

    /// The type argument describes a class, not an interface.
    #[error("EventAdapter argument must be interface, `{name}` is not")]
    NotAnInterface {
        /// Name of the offending type.
        name: String,
    },

    /// A method declares a primitive parameter.
    #[error(
        "primitive event parameters are not supported: `{interface}.{method}` parameter {index} is `{found}`"
    )]
    PrimitiveParameter {
        /// Interface being adapted.
        interface: String,
        /// Method declaring the parameter.
        method: String,
        /// 0-based parameter index.
        index: usize,
        /// Signature of the rejected type.
        found: String,
    },
}

/// Errors raised while generating or installing an adapter type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Two methods produced the same slot.
    #[error("duplicate method slot `{method}{signature}` in `{interface}`")]
    DuplicateSlot {
        /// Interface being adapted.
        interface: String,
        /// Method name.
        method: String,
        /// Method descriptor.
        signature: String,
    },

    /// The type space already holds a type with the generated name.
    #[error("a type named `{name}` is already installed")]
    NameCollision {
        /// The generated type name.
        name: String,
    },
}

/// Errors raised when a listener value cannot be registered.
///
/// These are reported rather than fatal: the adapter stays usable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The value is neither a function nor a module/name reference.
    #[error("event listener must be an object or function, found {found}")]
    NotCallable {
        /// Kind of the rejected value.
        found: &'static str,
    },

    /// A module/name reference is missing one of its properties.
    #[error("event listener object is missing its `{property}` property")]
    MissingProperty {
        /// The missing property.
        property: &'static str,
    },

    /// A module/name property holds something other than a string.
    #[error("event listener property `{property}` must be a string, found {found}")]
    InvalidProperty {
        /// The offending property.
        property: &'static str,
        /// Kind of the value found.
        found: &'static str,
    },
}

/// Errors raised while forwarding a native call or running a listener.
#[derive(Error, Debug)]
pub enum InvocationError {
    /// A synchronous listener failed; the original cause is the source.
    #[error("listener for `{event}` failed")]
    Listener {
        /// The event being emitted.
        event: String,
        /// What the listener raised.
        #[source]
        source: BoxError,
    },

    /// No worker could be acquired for a lazily bound listener.
    #[error("failed to acquire a worker")]
    Worker(#[source] BoxError),

    /// A forwarded method received the wrong number of arguments.
    #[error("`{method}` takes {expected} argument(s), got {found}")]
    Arity {
        /// Method name.
        method: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        found: usize,
    },

    /// The adapter type has no method with that name and arity.
    #[error("`{interface}` has no method `{method}` taking {arity} argument(s)")]
    NoSuchMethod {
        /// Interface being adapted.
        interface: String,
        /// Requested method.
        method: String,
        /// Supplied argument count.
        arity: usize,
    },

    /// Several overloads match the same name and arity.
    #[error("call to `{interface}.{method}` with {arity} argument(s) is ambiguous")]
    Ambiguous {
        /// Interface being adapted.
        interface: String,
        /// Requested method.
        method: String,
        /// Supplied argument count.
        arity: usize,
    },

    /// The slot index is out of range.
    #[error("`{interface}` has no method slot {index}")]
    NoSuchSlot {
        /// Interface being adapted.
        interface: String,
        /// Requested slot.
        index: usize,
    },

    /// A synthesized return value could not be converted.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// Error returned by the emit path.
pub type EmitError = InvocationError;

/// Failure converting a [`Value`](crate::Value) into a Rust type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// The value has the wrong kind.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// The kind that was needed.
        expected: &'static str,
        /// The kind that was present.
        found: &'static str,
    },

    /// An integer does not fit the target type.
    #[error("integer {value} is out of range for {target}")]
    OutOfRange {
        /// The integer value.
        value: i64,
        /// The target type.
        target: &'static str,
    },
}

