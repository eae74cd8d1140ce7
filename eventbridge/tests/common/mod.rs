#![allow(dead_code)]

use eventbridge::{InterfaceDescriptor, MethodSignature, Primitive, TypeRef};
use std::time::Duration;

pub const TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Logging
// ============================================================================

/// Route tracing output through the test harness. `RUST_LOG` selects levels.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Test Interfaces
// ============================================================================

pub fn string() -> TypeRef {
    TypeRef::reference("java.lang.String")
}

/// `onTick(String)` and `boolean onAsk(String)`.
pub fn listener_interface() -> InterfaceDescriptor {
    InterfaceDescriptor::interface("com.example.Listener")
        .method(MethodSignature::new("onTick").param(string()))
        .method(
            MethodSignature::new("onAsk")
                .param(string())
                .returns(Primitive::Boolean),
        )
}

/// One method per return policy.
pub fn returns_interface() -> InterfaceDescriptor {
    InterfaceDescriptor::interface("com.example.Returns")
        .method(MethodSignature::new("asVoid"))
        .method(MethodSignature::new("asBoolean").returns(Primitive::Boolean))
        .method(MethodSignature::new("asByte").returns(Primitive::Byte))
        .method(MethodSignature::new("asInt").returns(Primitive::Int))
        .method(MethodSignature::new("asLong").returns(Primitive::Long))
        .method(MethodSignature::new("asChar").returns(Primitive::Char))
        .method(MethodSignature::new("asDouble").returns(Primitive::Double))
        .method(MethodSignature::new("asString").returns(string()))
        .method(MethodSignature::new("asArray").returns(TypeRef::array(TypeRef::object())))
}

/// `onEvent(Object)`.
pub fn single_event_interface(name: &str) -> InterfaceDescriptor {
    InterfaceDescriptor::interface(name).method(MethodSignature::new("onEvent").param(TypeRef::object()))
}
