//! Script-level values.
//!
//! [`Value`] is what crosses the boundary between native callers and
//! listeners: forwarded arguments, listener registrations and synthesized
//! return values are all values. [`Function`] wraps a shared callable with a
//! stable identity, so two clones of one function compare equal and a
//! separately built function never does.

use crate::{
    descriptor::InterfaceDescriptor,
    error::{BoxError, ConversionError},
};
use std::{
    any::Any,
    collections::BTreeMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

/// The top-level scope a function was defined in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Scope(Arc<str>);

impl Scope {
    /// The scope of functions created outside any module.
    pub fn global() -> Self {
        Scope(Arc::from("global"))
    }

    /// A module scope.
    pub fn module(name: &str) -> Self {
        Scope(Arc::from(name))
    }

    /// The scope name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::global()
    }
}

type Callable = dyn Fn(&[Value]) -> Result<Value, BoxError> + Send + Sync;

static NEXT_FUNCTION_ID: AtomicU64 = AtomicU64::new(1);

struct FunctionInner {
    id: u64,
    name: Option<String>,
    scope: Scope,
    call: Box<Callable>,
}

/// A callable value.
///
/// # Example
///
/// ```rust,ignore
/// let double = Function::new(|args| match args {
///     [Value::Int(n)] => Ok(Value::Int(n * 2)),
///     _ => Err("expected one integer".into()),
/// });
/// assert_eq!(double.call(&[Value::Int(21)])?, Value::Int(42));
/// ```
#[derive(Clone)]
pub struct Function {
    inner: Arc<FunctionInner>,
}

impl Function {
    /// Wrap a closure defined in the global scope.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self::build(None, Scope::global(), Box::new(f))
    }

    /// Wrap a named closure defined in `scope`.
    pub fn named<F>(name: impl Into<String>, scope: Scope, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self::build(Some(name.into()), scope, Box::new(f))
    }

    fn build(name: Option<String>, scope: Scope, call: Box<Callable>) -> Self {
        Self {
            inner: Arc::new(FunctionInner {
                id: NEXT_FUNCTION_ID.fetch_add(1, Ordering::Relaxed),
                name,
                scope,
                call,
            }),
        }
    }

    /// Call the function.
    pub fn call(&self, args: &[Value]) -> Result<Value, BoxError> {
        (self.inner.call)(args)
    }

    /// The function's name, if it has one.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// The scope the function was defined in.
    pub fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    /// Whether both handles refer to the same function.
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("scope", &self.inner.scope.name())
            .finish()
    }
}

/// An opaque native object passed through as a reference.
#[derive(Clone)]
pub struct HostObject(Arc<dyn Any + Send + Sync>);

impl HostObject {
    /// Wrap a native value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        HostObject(Arc::new(value))
    }

    /// Borrow the wrapped value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl PartialEq for HostObject {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HostObject(..)")
    }
}

/// A script-level value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// The absence of a value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// Any integral number.
    Int(i64),
    /// Any floating-point number.
    Float(f64),
    /// A character.
    Char(char),
    /// A string.
    Str(String),
    /// An ordered list.
    List(Vec<Value>),
    /// A string-keyed object.
    Map(BTreeMap<String, Value>),
    /// A callable.
    Function(Function),
    /// A reference to a native type.
    Type(Arc<InterfaceDescriptor>),
    /// An opaque native object.
    Object(HostObject),
}

impl Value {
    /// The value kind, as reported in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Float(_) => "number",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "object",
            Value::Function(_) => "function",
            Value::Type(_) => "type",
            Value::Object(_) => "native object",
        }
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Build a map value from `(key, value)` pairs.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// A module/name listener reference.
    pub fn module_ref(module: impl Into<String>, name: impl Into<String>) -> Self {
        let (module, name): (String, String) = (module.into(), name.into());
        Value::map([("module", module), ("name", name)])
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(_) => f.write_str("[object Object]"),
            Value::Function(func) => match func.name() {
                Some(name) => write!(f, "function {name}"),
                None => f.write_str("function"),
            },
            Value::Type(desc) => write!(f, "[JavaClass {}]", desc.name()),
            Value::Object(_) => f.write_str("[native object]"),
        }
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Int(i64::from(n))
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Float(f64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<InterfaceDescriptor> for Value {
    fn from(desc: InterfaceDescriptor) -> Self {
        Value::Type(Arc::new(desc))
    }
}

impl From<Arc<InterfaceDescriptor>> for Value {
    fn from(desc: Arc<InterfaceDescriptor>) -> Self {
        Value::Type(desc)
    }
}

impl From<HostObject> for Value {
    fn from(obj: HostObject) -> Self {
        Value::Object(obj)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

/// Conversion from a [`Value`] back into a Rust type.
///
/// Used on the return path of typed adapters, where a synthesized default
/// has to become the trait method's declared return type.
pub trait FromValue: Sized {
    /// Convert, failing on a kind mismatch.
    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(()),
            other => Err(mismatch("null", &other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch("boolean", &other)),
        }
    }
}

impl FromValue for char {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Char(c) => Ok(c),
            other => Err(mismatch("char", &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(n) => Ok(n),
            Value::Int(n) => Ok(n as f64),
            other => Err(mismatch("number", &other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        f64::from_value(value).map(|n| n as f32)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

macro_rules! int_from_value {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: Value) -> Result<Self, ConversionError> {
                    match value {
                        Value::Int(n) => <$t>::try_from(n).map_err(|_| ConversionError::OutOfRange {
                            value: n,
                            target: stringify!($t),
                        }),
                        other => Err(mismatch("number", &other)),
                    }
                }
            }
        )*
    };
}

int_from_value!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

fn mismatch(expected: &'static str, found: &Value) -> ConversionError {
    ConversionError::TypeMismatch {
        expected,
        found: found.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_identity() {
        let f = Function::new(|_| Ok(Value::Null));
        let same = f.clone();
        let other = Function::new(|_| Ok(Value::Null));

        assert_eq!(Value::from(f.clone()), Value::from(same));
        assert_ne!(Value::from(f), Value::from(other));
    }

    #[test]
    fn test_function_call() {
        let add = Function::named("add", Scope::module("math"), |args| {
            let mut sum = 0;
            for arg in args {
                sum += i64::from_value(arg.clone())?;
            }
            Ok(Value::Int(sum))
        });
        assert_eq!(add.call(&[1.into(), 2.into()]).unwrap(), Value::Int(3));
        assert_eq!(add.name(), Some("add"));
        assert_eq!(add.scope().name(), "math");
    }

    #[test]
    fn test_from_value_conversions() {
        assert_eq!(bool::from_value(Value::Bool(true)), Ok(true));
        assert_eq!(i32::from_value(Value::Int(0)), Ok(0));
        assert_eq!(f64::from_value(Value::Float(0.0)), Ok(0.0));
        assert_eq!(<()>::from_value(Value::Null), Ok(()));
        assert_eq!(Option::<String>::from_value(Value::Null), Ok(None));
        assert!(matches!(
            i8::from_value(Value::Int(300)),
            Err(ConversionError::OutOfRange { .. })
        ));
        assert!(matches!(
            bool::from_value(Value::Int(1)),
            Err(ConversionError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_module_ref_shape() {
        let v = Value::module_ref("app/events", "onTick");
        let Value::Map(map) = v else {
            panic!("expected a map");
        };
        assert_eq!(map.get("module").and_then(Value::as_str), Some("app/events"));
        assert_eq!(map.get("name").and_then(Value::as_str), Some("onTick"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(vec![Value::Int(42), "x".into()]).to_string(), "[42, x]");
        assert_eq!(
            Value::from(InterfaceDescriptor::interface("java.lang.Runnable")).to_string(),
            "[JavaClass java.lang.Runnable]"
        );
    }
}
