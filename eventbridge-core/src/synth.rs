//! Adapter type synthesis.
//!
//! [`synthesize`] turns an [`InterfaceDescriptor`] into a [`SynthesizedType`]:
//! a table of [`MethodSlot`]s, one per declared method, each holding the
//! forwarding plan for that method. Every slot body does the same thing:
//!
//! 1. collect the call's arguments, in order;
//! 2. emit an event named after the method with those arguments;
//! 3. return the default for the declared return type (see [`ReturnPolicy`]).
//!
//! Generated types are installed into the process-wide [`TypeSpace`] under a
//! serial name (`EventAdapter1`, `EventAdapter2`, ...) and cached per
//! descriptor for the life of the process. The cache is never evicted;
//! adapted interfaces are few and stable.

use crate::{
    adapter::EventAdapter,
    descriptor::{InterfaceDescriptor, MethodSignature, Primitive, TypeRef},
    error::{AdapterError, GenerationError, InvocationError},
    value::Value,
};
use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::{
        Arc, LazyLock, Mutex, PoisonError, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
};

/// What a forwarding method hands back to its native caller.
///
/// The caller cannot wait for listener results, so each return type gets a
/// value meaning "nothing real available".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReturnPolicy {
    /// `void`: no value.
    Void,
    /// Integral kinds: zero.
    IntZero,
    /// `char`: the NUL character.
    CharZero,
    /// Floating-point kinds: zero.
    FloatZero,
    /// `boolean`: `true`, so "handled"/"accept" style callers default to
    /// permissive.
    True,
    /// Reference types: null.
    Absent,
}

impl ReturnPolicy {
    /// The policy for a declared return type.
    pub fn for_type(ty: &TypeRef) -> Self {
        match ty {
            TypeRef::Void => ReturnPolicy::Void,
            TypeRef::Primitive(Primitive::Boolean) => ReturnPolicy::True,
            TypeRef::Primitive(Primitive::Char) => ReturnPolicy::CharZero,
            TypeRef::Primitive(Primitive::Float | Primitive::Double) => ReturnPolicy::FloatZero,
            TypeRef::Primitive(Primitive::Byte | Primitive::Short | Primitive::Int | Primitive::Long) => {
                ReturnPolicy::IntZero
            }
            TypeRef::Reference(_) | TypeRef::Array(_) => ReturnPolicy::Absent,
        }
    }

    /// The value returned to the native caller.
    pub fn default_value(self) -> Value {
        match self {
            ReturnPolicy::Void | ReturnPolicy::Absent => Value::Null,
            ReturnPolicy::IntZero => Value::Int(0),
            ReturnPolicy::CharZero => Value::Char('\0'),
            ReturnPolicy::FloatZero => Value::Float(0.0),
            ReturnPolicy::True => Value::Bool(true),
        }
    }
}

/// One forwarding method of a synthesized type.
#[derive(Clone, Debug)]
pub struct MethodSlot {
    index: usize,
    method: MethodSignature,
    signature: String,
    ret: ReturnPolicy,
}

impl MethodSlot {
    /// Position in the slot table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Method name, also the emitted event name.
    pub fn name(&self) -> &str {
        &self.method.name
    }

    /// The declared method.
    pub fn method(&self) -> &MethodSignature {
        &self.method
    }

    /// Method descriptor, e.g. `(Ljava/lang/Object;)Z`.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Number of parameters.
    pub fn arity(&self) -> usize {
        self.method.arity()
    }

    /// Return-value policy.
    pub fn return_policy(&self) -> ReturnPolicy {
        self.ret
    }

    /// The slot body: emit the call as an event, then return the default.
    pub(crate) fn forward(
        &self,
        adapter: &EventAdapter,
        args: Vec<Value>,
    ) -> Result<Value, InvocationError> {
        if args.len() != self.arity() {
            return Err(InvocationError::Arity {
                method: self.method.name.clone(),
                expected: self.arity(),
                found: args.len(),
            });
        }
        adapter.emit(&self.method.name, &args)?;
        Ok(self.ret.default_value())
    }
}

/// A generated adapter type. Immutable once installed.
pub struct SynthesizedType {
    name: String,
    descriptor: InterfaceDescriptor,
    slots: Vec<MethodSlot>,
}

impl SynthesizedType {
    /// The generated name, unique in the process.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The adapted interface.
    pub fn descriptor(&self) -> &InterfaceDescriptor {
        &self.descriptor
    }

    /// The method table, in declaration order.
    pub fn slots(&self) -> &[MethodSlot] {
        &self.slots
    }

    /// The slot at `index`.
    pub fn slot(&self, index: usize) -> Result<&MethodSlot, InvocationError> {
        self.slots.get(index).ok_or_else(|| InvocationError::NoSuchSlot {
            interface: self.descriptor.name().to_owned(),
            index,
        })
    }

    /// Resolve a call by method name and argument count.
    pub fn resolve(&self, method: &str, arity: usize) -> Result<&MethodSlot, InvocationError> {
        let mut candidates = self
            .slots
            .iter()
            .filter(|slot| slot.name() == method && slot.arity() == arity);
        match (candidates.next(), candidates.next()) {
            (Some(slot), None) => Ok(slot),
            (Some(_), Some(_)) => Err(InvocationError::Ambiguous {
                interface: self.descriptor.name().to_owned(),
                method: method.to_owned(),
                arity,
            }),
            (None, _) => Err(InvocationError::NoSuchMethod {
                interface: self.descriptor.name().to_owned(),
                method: method.to_owned(),
                arity,
            }),
        }
    }
}

impl fmt::Debug for SynthesizedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesizedType")
            .field("name", &self.name)
            .field("interface", &self.descriptor.name())
            .field("slots", &self.slots.len())
            .finish()
    }
}

// ============================================================================
// TypeSpace - installed types
// ============================================================================

/// The process-wide set of installed adapter types, by generated name.
#[derive(Default)]
pub struct TypeSpace {
    types: RwLock<HashMap<String, Arc<SynthesizedType>>>,
}

static TYPE_SPACE: LazyLock<TypeSpace> = LazyLock::new(TypeSpace::default);

impl TypeSpace {
    /// The process-wide type space.
    pub fn global() -> &'static TypeSpace {
        &TYPE_SPACE
    }

    fn install(&self, ty: Arc<SynthesizedType>) -> Result<(), GenerationError> {
        let mut types = self.types.write().unwrap_or_else(PoisonError::into_inner);
        if types.contains_key(ty.name()) {
            return Err(GenerationError::NameCollision {
                name: ty.name().to_owned(),
            });
        }
        types.insert(ty.name().to_owned(), ty);
        Ok(())
    }

    /// Look up an installed type.
    pub fn lookup(&self, name: &str) -> Option<Arc<SynthesizedType>> {
        let types = self.types.read().unwrap_or_else(PoisonError::into_inner);
        types.get(name).cloned()
    }

    /// Number of installed types.
    pub fn installed_count(&self) -> usize {
        let types = self.types.read().unwrap_or_else(PoisonError::into_inner);
        types.len()
    }
}

// ============================================================================
// Synthesis
// ============================================================================

static ADAPTER_CACHE: LazyLock<Mutex<HashMap<InterfaceDescriptor, Arc<SynthesizedType>>>> =
    LazyLock::new(Default::default);

static SERIAL: AtomicUsize = AtomicUsize::new(0);

/// Produce the adapter type for `descriptor`, reusing a cached one if this
/// interface was adapted before.
///
/// Fails with a construction error if the descriptor is not an interface or
/// declares a primitive parameter, and with a generation error if the slot
/// table cannot be built or installed. Nothing is cached or installed on
/// failure.
pub fn synthesize(descriptor: &InterfaceDescriptor) -> Result<Arc<SynthesizedType>, AdapterError> {
    descriptor.validate()?;

    // Held across generation so concurrent first uses install only once.
    let mut cache = ADAPTER_CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(ty) = cache.get(descriptor) {
        #[cfg(feature = "tracing")]
        tracing::debug!(interface = descriptor.name(), ty = ty.name(), "adapter type cache hit");
        return Ok(Arc::clone(ty));
    }

    let name = format!("EventAdapter{}", SERIAL.fetch_add(1, Ordering::Relaxed) + 1);
    let ty = Arc::new(generate(name, descriptor)?);
    TypeSpace::global().install(Arc::clone(&ty))?;
    cache.insert(descriptor.clone(), Arc::clone(&ty));

    #[cfg(feature = "tracing")]
    tracing::debug!(
        interface = descriptor.name(),
        ty = ty.name(),
        slots = ty.slots().len(),
        "installed adapter type"
    );

    Ok(ty)
}

fn generate(
    name: String,
    descriptor: &InterfaceDescriptor,
) -> Result<SynthesizedType, GenerationError> {
    let mut seen = HashSet::new();
    let mut slots = Vec::with_capacity(descriptor.methods().len());

    for (index, method) in descriptor.methods().iter().enumerate() {
        let signature = method.signature();
        if !seen.insert((method.name.as_str(), signature.clone())) {
            return Err(GenerationError::DuplicateSlot {
                interface: descriptor.name().to_owned(),
                method: method.name.clone(),
                signature,
            });
        }
        slots.push(MethodSlot {
            index,
            method: method.clone(),
            signature,
            ret: ReturnPolicy::for_type(&method.ret),
        });
    }

    Ok(SynthesizedType {
        name,
        descriptor: descriptor.clone(),
        slots,
    })
}
