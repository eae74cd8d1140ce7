//! Interface descriptors.
//!
//! An [`InterfaceDescriptor`] is the runtime description of the native
//! interface being adapted: its name and the ordered signatures of its
//! methods. Descriptors compare structurally, so two equal descriptors denote
//! the same interface and share one synthesized adapter type.
//!
//! Signatures render in the JVM descriptor style (`I`, `Z`, `Ljava/lang/String;`,
//! `[B`, `(Ljava/lang/Object;)V`). The rendered string is the stable key of a
//! method slot.

use crate::error::ConstructionError;
use std::fmt;

/// A primitive (non-reference) type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `boolean`
    Boolean,
    /// `byte`
    Byte,
    /// `short`
    Short,
    /// `char`
    Char,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
}

impl Primitive {
    /// The one-letter descriptor code.
    pub const fn code(self) -> char {
        match self {
            Primitive::Boolean => 'Z',
            Primitive::Byte => 'B',
            Primitive::Short => 'S',
            Primitive::Char => 'C',
            Primitive::Int => 'I',
            Primitive::Long => 'J',
            Primitive::Float => 'F',
            Primitive::Double => 'D',
        }
    }

    /// The source-level keyword.
    pub const fn keyword(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Char => "char",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }
}

/// A parameter or return type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// No value; only valid as a return type.
    Void,
    /// A primitive type.
    Primitive(Primitive),
    /// A named reference type, in dotted form (`java.lang.Object`).
    Reference(String),
    /// An array of the component type.
    Array(Box<TypeRef>),
}

impl TypeRef {
    /// A named reference type.
    pub fn reference(name: impl Into<String>) -> Self {
        TypeRef::Reference(name.into())
    }

    /// An array of `component`.
    pub fn array(component: TypeRef) -> Self {
        TypeRef::Array(Box::new(component))
    }

    /// The root object type.
    pub fn object() -> Self {
        TypeRef::reference("java.lang.Object")
    }

    /// Whether values of this type are passed by reference.
    ///
    /// Arrays are references even when their component type is primitive.
    pub fn is_reference(&self) -> bool {
        matches!(self, TypeRef::Reference(_) | TypeRef::Array(_))
    }

    /// Render the type descriptor, e.g. `[Ljava/lang/String;`.
    pub fn signature(&self) -> String {
        let mut out = String::new();
        self.write_signature(&mut out);
        out
    }

    fn write_signature(&self, out: &mut String) {
        match self {
            TypeRef::Void => out.push('V'),
            TypeRef::Primitive(p) => out.push(p.code()),
            TypeRef::Reference(name) => {
                out.push('L');
                out.extend(name.chars().map(|c| if c == '.' { '/' } else { c }));
                out.push(';');
            }
            TypeRef::Array(component) => {
                out.push('[');
                component.write_signature(out);
            }
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => f.write_str("void"),
            TypeRef::Primitive(p) => f.write_str(p.keyword()),
            TypeRef::Reference(name) => f.write_str(name),
            TypeRef::Array(component) => write!(f, "{component}[]"),
        }
    }
}

impl From<Primitive> for TypeRef {
    fn from(p: Primitive) -> Self {
        TypeRef::Primitive(p)
    }
}

/// One declared interface method.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    /// Method name; also the name of the emitted event.
    pub name: String,
    /// Ordered parameter types.
    pub params: Vec<TypeRef>,
    /// Declared return type.
    pub ret: TypeRef,
}

impl MethodSignature {
    /// A `void` method with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            ret: TypeRef::Void,
        }
    }

    /// Append a parameter.
    pub fn param(mut self, ty: impl Into<TypeRef>) -> Self {
        self.params.push(ty.into());
        self
    }

    /// Set the return type.
    pub fn returns(mut self, ty: impl Into<TypeRef>) -> Self {
        self.ret = ty.into();
        self
    }

    /// Number of parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Render the method descriptor, e.g. `(Ljava/lang/Object;)Z`.
    pub fn signature(&self) -> String {
        let mut out = String::from("(");
        for param in &self.params {
            param.write_signature(&mut out);
        }
        out.push(')');
        self.ret.write_signature(&mut out);
        out
    }
}

/// Whether a described type is an interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// An interface; adaptable.
    Interface,
    /// A concrete or abstract class; not adaptable.
    Class,
}

/// Runtime description of a native type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InterfaceDescriptor {
    name: String,
    kind: TypeKind,
    methods: Vec<MethodSignature>,
}

impl InterfaceDescriptor {
    /// Describe an interface with no methods yet.
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Interface,
            methods: Vec::new(),
        }
    }

    /// Describe a class. Classes are rejected by the adapter.
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Class,
            methods: Vec::new(),
        }
    }

    /// Append a method.
    pub fn method(mut self, method: MethodSignature) -> Self {
        self.methods.push(method);
        self
    }

    /// The type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type kind.
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Whether this describes an interface.
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    /// Declared methods in declaration order.
    pub fn methods(&self) -> &[MethodSignature] {
        &self.methods
    }

    /// Check that this type can be adapted.
    pub fn validate(&self) -> Result<(), ConstructionError> {
        if !self.is_interface() {
            return Err(ConstructionError::NotAnInterface {
                name: self.name.clone(),
            });
        }
        for method in &self.methods {
            if let Some((index, ty)) = method
                .params
                .iter()
                .enumerate()
                .find(|(_, ty)| !ty.is_reference())
            {
                return Err(ConstructionError::PrimitiveParameter {
                    interface: self.name.clone(),
                    method: method.name.clone(),
                    index,
                    found: ty.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for InterfaceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TypeKind::Interface => write!(f, "interface {}", self.name),
            TypeKind::Class => write!(f, "class {}", self.name),
        }
    }
}
